use std::collections::BTreeMap;
use std::str::FromStr;

use lattica_application::{AccessibleItem, GrantOutcome, PermissionGrant};
use lattica_core::AppError;
use lattica_domain::{ItemId, ItemRef, ItemType};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Incoming payload for a merge-upward grant.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/grant-permission-request.ts"
)]
pub struct GrantPermissionRequest {
    pub target_user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: String,
    pub mask: u8,
}

/// Incoming payload for an outright mask replacement.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-permission-request.ts"
)]
pub struct UpdatePermissionRequest {
    pub target_user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: String,
    pub new_mask: u8,
}

/// Incoming payload for a grant revocation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/revoke-permission-request.ts"
)]
pub struct RevokePermissionRequest {
    pub target_user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: String,
}

/// Incoming payload for a boolean permission check.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-check-request.ts"
)]
pub struct PermissionCheckRequest {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: String,
    pub required_mask: u8,
}

/// Incoming payload for a single effective-mask query.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/effective-mask-request.ts"
)]
pub struct EffectiveMaskRequest {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: String,
}

/// Incoming payload for a batch effective-mask query.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/batch-effective-mask-request.ts"
)]
pub struct BatchEffectiveMaskRequest {
    pub user_id: Uuid,
    pub item_type: String,
    pub item_ids: Vec<Uuid>,
}

/// Query parameters for the accessible-items listing.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/accessible-items-query.ts"
)]
pub struct AccessibleItemsQuery {
    pub user_id: Uuid,
    pub item_type: String,
}

/// API representation of a stored permission grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-grant-response.ts"
)]
pub struct PermissionGrantResponse {
    pub user_id: String,
    pub tenant_id: String,
    pub item_id: String,
    pub item_type: String,
    pub mask: u8,
    pub created_at: String,
}

/// API representation of a grant outcome.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/grant-outcome-response.ts"
)]
pub struct GrantOutcomeResponse {
    pub status: String,
    pub effective_mask: u8,
    pub grant: Option<PermissionGrantResponse>,
}

/// API representation of a boolean permission check.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-check-response.ts"
)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
}

/// API representation of a single effective mask.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/effective-mask-response.ts"
)]
pub struct EffectiveMaskResponse {
    pub mask: u8,
}

/// API representation of a batch effective-mask query.
///
/// Every requested item id has an entry; ids without access map to 0.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/batch-effective-mask-response.ts"
)]
pub struct BatchEffectiveMaskResponse {
    pub masks: BTreeMap<String, u8>,
}

/// API representation of one accessible item.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/accessible-item-response.ts"
)]
pub struct AccessibleItemResponse {
    pub item_id: String,
    pub mask: u8,
}

/// Parses a transport (item id, item type) pair into an item reference.
pub fn parse_item_ref(item_id: Uuid, item_type: &str) -> Result<ItemRef, AppError> {
    Ok(ItemRef::new(
        ItemId::from_uuid(item_id),
        ItemType::from_str(item_type)?,
    ))
}

impl From<PermissionGrant> for PermissionGrantResponse {
    fn from(value: PermissionGrant) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            tenant_id: value.tenant_id.to_string(),
            item_id: value.item_id.to_string(),
            item_type: value.item_type.as_str().to_owned(),
            mask: value.mask.bits(),
            created_at: value.created_at,
        }
    }
}

impl From<GrantOutcome> for GrantOutcomeResponse {
    fn from(value: GrantOutcome) -> Self {
        match value {
            GrantOutcome::AlreadyCovered { effective_mask } => Self {
                status: "already_covered".to_owned(),
                effective_mask: effective_mask.bits(),
                grant: None,
            },
            GrantOutcome::Stored(grant) => Self {
                status: "stored".to_owned(),
                effective_mask: grant.mask.bits(),
                grant: Some(PermissionGrantResponse::from(grant)),
            },
        }
    }
}

impl From<AccessibleItem> for AccessibleItemResponse {
    fn from(value: AccessibleItem) -> Self {
        Self {
            item_id: value.item_id.to_string(),
            mask: value.mask.bits(),
        }
    }
}
