use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use lattica_application::HierarchyProvider;
use lattica_core::{AppError, AppResult, TenantId};
use lattica_domain::{AncestorChain, ItemId, ItemRef, ItemType};

use crate::item_catalog::item_table;

/// PostgreSQL-backed item tree reader.
///
/// Every item row carries a denormalized `ancestor_ids` array maintained by
/// the tree-mutation path, so ancestor lookups are a single indexed read and
/// descendant lookups an array-containment scan, never a recursive traversal.
#[derive(Clone)]
pub struct PostgresHierarchyProvider {
    pool: PgPool,
}

impl PostgresHierarchyProvider {
    /// Creates a provider with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn contained_ids(
        &self,
        tenant_id: TenantId,
        container_id: ItemId,
        target_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        let query = format!(
            "SELECT id FROM {} WHERE tenant_id = $1 AND $2 = ANY(ancestor_ids) ORDER BY id",
            item_table(target_type)
        );

        let ids = sqlx::query_scalar::<_, Uuid>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(container_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to list {} descendants of '{container_id}' in tenant '{tenant_id}': {error}",
                    target_type.as_str()
                ))
            })?;

        Ok(ids.into_iter().map(ItemId::from_uuid).collect())
    }
}

#[async_trait]
impl HierarchyProvider for PostgresHierarchyProvider {
    async fn all_parents(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Option<AncestorChain>> {
        let query = format!(
            "SELECT ancestor_ids FROM {} WHERE tenant_id = $1 AND id = $2",
            item_table(item.item_type)
        );

        let ancestor_ids = sqlx::query_scalar::<_, Vec<Uuid>>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(item.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to load ancestor chain for {} '{}' in tenant '{tenant_id}': {error}",
                    item.item_type, item.id
                ))
            })?;

        Ok(ancestor_ids
            .map(|ids| AncestorChain::new(ids.into_iter().map(ItemId::from_uuid).collect())))
    }

    async fn all_descendants(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Vec<ItemRef>> {
        if !item.item_type.is_container() {
            return Ok(Vec::new());
        }

        let mut descendants = Vec::new();
        for target_type in ItemType::all() {
            let ids = self.contained_ids(tenant_id, item.id, *target_type).await?;
            descendants.extend(ids.into_iter().map(|id| ItemRef::new(id, *target_type)));
        }

        Ok(descendants)
    }

    async fn descendants_of_type(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
        target_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        if !item.item_type.is_container() {
            return Ok(Vec::new());
        }

        self.contained_ids(tenant_id, item.id, target_type).await
    }
}
