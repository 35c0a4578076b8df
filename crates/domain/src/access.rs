use std::fmt::{Display, Formatter};

use lattica_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Three-bit permission value attached to a grant.
///
/// Bit 1 is read, bit 2 is write, bit 4 is execute. The value of a grant is
/// always the full mask of its winning row; masks are never combined across
/// hierarchy levels during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionMask(u8);

impl PermissionMask {
    /// Mask with no permission bits set.
    pub const NONE: Self = Self(0);
    /// Read permission bit.
    pub const READ: Self = Self(0b001);
    /// Write permission bit.
    pub const WRITE: Self = Self(0b010);
    /// Execute permission bit.
    pub const EXECUTE: Self = Self(0b100);
    /// All three permission bits.
    pub const ALL: Self = Self(0b111);

    /// Creates a mask from raw bits, rejecting values outside `[0, 7]`.
    pub fn from_bits(bits: u8) -> AppResult<Self> {
        if bits > Self::ALL.0 {
            return Err(AppError::Validation(format!(
                "permission mask must be between 0 and 7, got {bits}"
            )));
        }

        Ok(Self(bits))
    }

    /// Returns the raw bit value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns whether every bit of `other` is set in this mask.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the bitwise union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns whether no permission bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns whether the read bit is set.
    #[must_use]
    pub const fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    /// Returns whether the write bit is set.
    #[must_use]
    pub const fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    /// Returns whether the execute bit is set.
    #[must_use]
    pub const fn can_execute(self) -> bool {
        self.contains(Self::EXECUTE)
    }
}

impl Display for PermissionMask {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated mask for permission checks.
///
/// A check must request at least read, and may request write or execute only
/// together with read. A zero mask is not a meaningful question and is
/// rejected before any store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequiredMask(PermissionMask);

impl RequiredMask {
    /// Read-only check mask.
    pub const READ_ONLY: Self = Self(PermissionMask::READ);
    /// Read-and-write check mask used for grant management preconditions.
    pub const MANAGE: Self = Self(PermissionMask(0b011));

    /// Creates a validated check mask.
    pub fn new(mask: PermissionMask) -> AppResult<Self> {
        if mask.is_empty() {
            return Err(AppError::Validation(
                "required mask must request at least one permission".to_owned(),
            ));
        }

        if !mask.can_read() {
            return Err(AppError::Validation(
                "required mask must include read; write and execute cannot be checked alone"
                    .to_owned(),
            ));
        }

        Ok(Self(mask))
    }

    /// Creates a validated check mask from raw bits.
    pub fn from_bits(bits: u8) -> AppResult<Self> {
        Self::new(PermissionMask::from_bits(bits)?)
    }

    /// Returns the underlying permission mask.
    #[must_use]
    pub const fn mask(self) -> PermissionMask {
        self.0
    }
}

/// Stable audit actions emitted by the grant engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a grant row is created or merged upward.
    AccessGrantStored,
    /// Emitted when a grant mask is replaced outright.
    AccessGrantUpdated,
    /// Emitted when a grant row is revoked.
    AccessGrantRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessGrantStored => "access.grant.stored",
            Self::AccessGrantUpdated => "access.grant.updated",
            Self::AccessGrantRevoked => "access.grant.revoked",
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{PermissionMask, RequiredMask};

    #[test]
    fn mask_rejects_out_of_range_bits() {
        assert!(PermissionMask::from_bits(8).is_err());
        assert!(PermissionMask::from_bits(255).is_err());
    }

    #[test]
    fn mask_accepts_full_range() {
        for bits in 0..=7u8 {
            assert!(PermissionMask::from_bits(bits).is_ok());
        }
    }

    #[test]
    fn union_of_read_and_write_contains_both() {
        let merged = PermissionMask::READ.union(PermissionMask::WRITE);
        assert!(merged.can_read());
        assert!(merged.can_write());
        assert!(!merged.can_execute());
        assert_eq!(merged.bits(), 3);
    }

    #[test]
    fn required_mask_rejects_zero() {
        assert!(RequiredMask::from_bits(0).is_err());
    }

    #[test]
    fn required_mask_rejects_write_without_read() {
        assert!(RequiredMask::from_bits(PermissionMask::WRITE.bits()).is_err());
        assert!(RequiredMask::from_bits(PermissionMask::EXECUTE.bits()).is_err());
        assert!(RequiredMask::from_bits(0b110).is_err());
    }

    #[test]
    fn required_mask_accepts_read_combinations() {
        for bits in [0b001u8, 0b011, 0b101, 0b111] {
            assert!(RequiredMask::from_bits(bits).is_ok());
        }
    }

    proptest! {
        #[test]
        fn union_contains_both_operands(left in 0..=7u8, right in 0..=7u8) {
            let left = PermissionMask::from_bits(left);
            let right = PermissionMask::from_bits(right);
            prop_assert!(left.is_ok() && right.is_ok());
            if let (Ok(left), Ok(right)) = (left, right) {
                let merged = left.union(right);
                prop_assert!(merged.contains(left));
                prop_assert!(merged.contains(right));
                prop_assert!(merged.bits() <= 7);
            }
        }

        #[test]
        fn contains_is_reflexive(bits in 0..=7u8) {
            if let Ok(mask) = PermissionMask::from_bits(bits) {
                prop_assert!(mask.contains(mask));
                prop_assert!(mask.contains(PermissionMask::NONE));
            }
        }
    }
}
