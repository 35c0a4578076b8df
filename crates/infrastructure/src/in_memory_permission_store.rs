use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use lattica_application::{GrantUpsert, PermissionGrant, PermissionStore};
use lattica_core::{AppError, AppResult, TenantId};
use lattica_domain::{ItemId, ItemRef, ItemType, PermissionMask, UserId};

use crate::InMemoryHierarchyProvider;

/// In-memory permission store implementation.
///
/// Mirrors the PostgreSQL adapter's semantics for tests and local runs. All
/// mutations take the write lock for their whole multi-step sequence, so a
/// merge-upward write is atomic the same way the transactional adapter is.
#[derive(Debug)]
pub struct InMemoryPermissionStore {
    hierarchy: Arc<InMemoryHierarchyProvider>,
    rows: RwLock<Vec<PermissionGrant>>,
}

impl InMemoryPermissionStore {
    /// Creates an empty store over an in-memory item tree.
    #[must_use]
    pub fn new(hierarchy: Arc<InMemoryHierarchyProvider>) -> Self {
        Self {
            hierarchy,
            rows: RwLock::new(Vec::new()),
        }
    }
}

fn grant_not_found(user_id: UserId, item: ItemRef) -> AppError {
    AppError::NotFound(format!(
        "grant for user '{user_id}' on {} '{}' was not found",
        item.item_type, item.id
    ))
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn find_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|row| {
                row.tenant_id == tenant_id
                    && row.user_id == user_id
                    && row.item_id == item.id
                    && row.item_type == item.item_type
            })
            .cloned())
    }

    async fn find_grants_for_items(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| {
                row.tenant_id == tenant_id
                    && row.user_id == user_id
                    && item_ids.contains(&row.item_id)
            })
            .cloned()
            .collect())
    }

    async fn merge_grant(
        &self,
        grant: GrantUpsert,
        prune_candidates: &[ItemId],
    ) -> AppResult<PermissionGrant> {
        let mut rows = self.rows.write().await;

        rows.retain(|row| {
            !(row.tenant_id == grant.tenant_id
                && row.user_id == grant.user_id
                && prune_candidates.contains(&row.item_id)
                && grant.mask.contains(row.mask))
        });

        if let Some(existing) = rows.iter_mut().find(|row| {
            row.tenant_id == grant.tenant_id
                && row.user_id == grant.user_id
                && row.item_id == grant.item.id
                && row.item_type == grant.item.item_type
        }) {
            existing.mask = existing.mask.union(grant.mask);
            return Ok(existing.clone());
        }

        let row = PermissionGrant {
            user_id: grant.user_id,
            tenant_id: grant.tenant_id,
            item_id: grant.item.id,
            item_type: grant.item.item_type,
            mask: grant.mask,
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn replace_grant_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        mask: PermissionMask,
    ) -> AppResult<PermissionGrant> {
        let mut rows = self.rows.write().await;

        let Some(existing) = rows.iter_mut().find(|row| {
            row.tenant_id == tenant_id
                && row.user_id == user_id
                && row.item_id == item.id
                && row.item_type == item.item_type
        }) else {
            return Err(grant_not_found(user_id, item));
        };

        existing.mask = mask;
        Ok(existing.clone())
    }

    async fn delete_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let before = rows.len();

        rows.retain(|row| {
            !(row.tenant_id == tenant_id
                && row.user_id == user_id
                && row.item_id == item.id
                && row.item_type == item.item_type)
        });

        if rows.len() == before {
            return Err(grant_not_found(user_id, item));
        }

        Ok(())
    }

    async fn accessible_item_ids(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        let entries = self.hierarchy.items_with_chains(tenant_id, item_type).await;
        let rows = self.rows.read().await;

        Ok(entries
            .into_iter()
            .filter(|(item_id, chain)| {
                rows.iter().any(|row| {
                    row.tenant_id == tenant_id
                        && row.user_id == user_id
                        && (row.item_id == *item_id || chain.ids().contains(&row.item_id))
                })
            })
            .map(|(item_id, _)| item_id)
            .collect())
    }
}
