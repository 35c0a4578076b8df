use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use lattica_application::{GrantUpsert, PermissionGrant, PermissionStore};
use lattica_core::{AppError, AppResult, TenantId};
use lattica_domain::{ItemId, ItemRef, ItemType, PermissionMask, UserId};

mod grants;
mod lookups;


/// PostgreSQL-backed permission store.
///
/// The `(user_id, item_id, item_type)` uniqueness constraint serializes
/// writes per grant identity, and every multi-step mutation runs inside one
/// transaction, so a merge-upward write can never leave descendant rows
/// deleted without the new grant committed.
#[derive(Clone)]
pub struct PostgresPermissionStore {
    pool: PgPool,
}

impl PostgresPermissionStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    user_id: Uuid,
    tenant_id: Uuid,
    item_id: Uuid,
    item_type: String,
    permission_mask: i16,
    created_at: String,
}

impl GrantRow {
    fn into_grant(self) -> AppResult<PermissionGrant> {
        let item_type = ItemType::from_str(self.item_type.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode item type '{}' on grant row: {error}",
                self.item_type
            ))
        })?;

        let bits = u8::try_from(self.permission_mask).map_err(|error| {
            AppError::Internal(format!(
                "permission mask {} on grant row is out of range: {error}",
                self.permission_mask
            ))
        })?;
        let mask = PermissionMask::from_bits(bits).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode permission mask {bits} on grant row: {error}"
            ))
        })?;

        Ok(PermissionGrant {
            user_id: UserId::from_uuid(self.user_id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            item_id: ItemId::from_uuid(self.item_id),
            item_type,
            mask,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl PermissionStore for PostgresPermissionStore {
    async fn find_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<Option<PermissionGrant>> {
        self.find_grant_impl(tenant_id, user_id, item).await
    }

    async fn find_grants_for_items(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> AppResult<Vec<PermissionGrant>> {
        self.find_grants_for_items_impl(tenant_id, user_id, item_ids)
            .await
    }

    async fn merge_grant(
        &self,
        grant: GrantUpsert,
        prune_candidates: &[ItemId],
    ) -> AppResult<PermissionGrant> {
        self.merge_grant_impl(grant, prune_candidates).await
    }

    async fn replace_grant_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        mask: PermissionMask,
    ) -> AppResult<PermissionGrant> {
        self.replace_grant_mask_impl(tenant_id, user_id, item, mask)
            .await
    }

    async fn delete_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<()> {
        self.delete_grant_impl(tenant_id, user_id, item).await
    }

    async fn accessible_item_ids(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        self.accessible_item_ids_impl(tenant_id, user_id, item_type)
            .await
    }
}
