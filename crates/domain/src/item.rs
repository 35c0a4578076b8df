use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lattica_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an item of any type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random item identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an item identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItemId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Structural variants of the item tree.
///
/// Folders form the containment tree; projects, files, and blocks each attach
/// to exactly one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Top-level work unit attached to a folder.
    Project,
    /// Container node of the tree.
    Folder,
    /// File attached to a folder.
    File,
    /// Content block attached to a folder.
    Block,
}

impl ItemType {
    /// Returns a stable storage value for this item type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Folder => "folder",
            Self::File => "file",
            Self::Block => "block",
        }
    }

    /// Returns all known item types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ItemType] = &[
            ItemType::Project,
            ItemType::Folder,
            ItemType::File,
            ItemType::Block,
        ];

        ALL
    }

    /// Returns whether items of this type can contain other items.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Folder)
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "project" => Ok(Self::Project),
            "folder" => Ok(Self::Folder),
            "file" => Ok(Self::File),
            "block" => Ok(Self::Block),
            _ => Err(AppError::Validation(format!(
                "unknown item type '{value}'"
            ))),
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Identifier and type of one item, the unit the access engine operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Item identifier.
    pub id: ItemId,
    /// Item type tag.
    pub item_type: ItemType,
}

impl ItemRef {
    /// Creates an item reference.
    #[must_use]
    pub fn new(id: ItemId, item_type: ItemType) -> Self {
        Self { id, item_type }
    }
}

/// Ordered ancestor folder ids of one item, root-first.
///
/// The chain is denormalized per item row and owned by the hierarchy
/// provider: it is always the true path from the tree root down to the item's
/// immediate container, inclusive. Items that attach to a folder must have a
/// non-empty chain; only a root folder legitimately has an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorChain(Vec<ItemId>);

impl AncestorChain {
    /// Creates a chain from ordered ancestor ids, root-first.
    #[must_use]
    pub fn new(ids: Vec<ItemId>) -> Self {
        Self(ids)
    }

    /// Creates an empty chain.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the ancestor ids in root-first order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        self.0.as_slice()
    }

    /// Returns whether the chain has no ancestors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of ancestors in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates ancestors from the nearest container up to the root.
    pub fn nearest_first(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter().rev().copied()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AncestorChain, ItemId, ItemType};

    #[test]
    fn item_type_roundtrip_storage_value() {
        for item_type in ItemType::all() {
            let restored = ItemType::from_str(item_type.as_str());
            assert!(restored.is_ok());
            assert_eq!(restored.unwrap_or(ItemType::Folder), *item_type);
        }
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        assert!(ItemType::from_str("workspace").is_err());
    }

    #[test]
    fn only_folders_are_containers() {
        assert!(ItemType::Folder.is_container());
        assert!(!ItemType::Project.is_container());
        assert!(!ItemType::File.is_container());
        assert!(!ItemType::Block.is_container());
    }

    #[test]
    fn nearest_first_walks_chain_from_leaf_to_root() {
        let root = ItemId::new();
        let middle = ItemId::new();
        let leaf = ItemId::new();
        let chain = AncestorChain::new(vec![root, middle, leaf]);

        let nearest: Vec<ItemId> = chain.nearest_first().collect();
        assert_eq!(nearest, vec![leaf, middle, root]);
    }
}
