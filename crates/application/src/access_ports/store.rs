use async_trait::async_trait;
use lattica_core::{AppResult, TenantId};
use lattica_domain::{ItemId, ItemRef, ItemType, PermissionMask, UserId};

/// One user's direct access to one item.
///
/// Identity is the (user, item, item type) triple; the store never holds more
/// than one row per triple. Absence of a row means "no direct grant";
/// inherited access is computed at read time, never materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    /// User holding the grant.
    pub user_id: UserId,
    /// Tenant scope of the grant.
    pub tenant_id: TenantId,
    /// Granted item identifier.
    pub item_id: ItemId,
    /// Granted item type.
    pub item_type: ItemType,
    /// Permission mask stored on the row.
    pub mask: PermissionMask,
    /// Creation timestamp in RFC3339.
    pub created_at: String,
}

impl PermissionGrant {
    /// Returns the reference of the granted item.
    #[must_use]
    pub fn item(&self) -> ItemRef {
        ItemRef::new(self.item_id, self.item_type)
    }
}

/// Input row for a merge-upward grant write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantUpsert {
    /// Tenant scope of the grant.
    pub tenant_id: TenantId,
    /// User receiving the grant.
    pub user_id: UserId,
    /// Item the grant applies to.
    pub item: ItemRef,
    /// Requested permission mask.
    pub mask: PermissionMask,
}

/// Port for the durable grant mapping.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Returns the user's direct grant on an item, if any.
    async fn find_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<Option<PermissionGrant>>;

    /// Returns the user's grants on any of the given item ids.
    async fn find_grants_for_items(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Applies a merge-upward grant in one atomic write: deletes the user's
    /// grants on `prune_candidates` whose mask is a subset of the new mask,
    /// then inserts the grant row or OR-merges the mask into an existing one.
    async fn merge_grant(
        &self,
        grant: GrantUpsert,
        prune_candidates: &[ItemId],
    ) -> AppResult<PermissionGrant>;

    /// Replaces the mask of an existing direct grant outright.
    ///
    /// Returns `NotFound` when the user has no direct grant on the item.
    async fn replace_grant_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        mask: PermissionMask,
    ) -> AppResult<PermissionGrant>;

    /// Deletes an existing direct grant.
    ///
    /// Returns `NotFound` when the user has no direct grant on the item.
    async fn delete_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<()>;

    /// Returns ids of items of one type the user holds a grant on, directly
    /// or through an ancestor.
    ///
    /// This is a candidate superset: nearest-wins resolution still decides
    /// the effective mask of every returned id.
    async fn accessible_item_ids(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
    ) -> AppResult<Vec<ItemId>>;
}
