use crate::item_catalog::item_table;

use super::*;

impl PostgresPermissionStore {
    pub(super) async fn find_grant_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<Option<PermissionGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT
                user_id,
                tenant_id,
                item_id,
                item_type,
                permission_mask,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM permission_grants
            WHERE tenant_id = $1
                AND user_id = $2
                AND item_id = $3
                AND item_type = $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(item.id.as_uuid())
        .bind(item.item_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load grant for user '{user_id}' on {} '{}' in tenant '{tenant_id}': {error}",
                item.item_type, item.id
            ))
        })?;

        row.map(GrantRow::into_grant).transpose()
    }

    pub(super) async fn find_grants_for_items_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> AppResult<Vec<PermissionGrant>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = item_ids.iter().map(|item_id| item_id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT
                user_id,
                tenant_id,
                item_id,
                item_type,
                permission_mask,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM permission_grants
            WHERE tenant_id = $1
                AND user_id = $2
                AND item_id = ANY($3)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load candidate grants for user '{user_id}' in tenant '{tenant_id}': {error}"
            ))
        })?;

        rows.into_iter().map(GrantRow::into_grant).collect()
    }

    pub(super) async fn accessible_item_ids_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        let query = format!(
            r#"
            SELECT items.id
            FROM {} AS items
            WHERE items.tenant_id = $1
                AND EXISTS (
                    SELECT 1
                    FROM permission_grants AS grants
                    WHERE grants.tenant_id = items.tenant_id
                        AND grants.user_id = $2
                        AND (grants.item_id = items.id OR grants.item_id = ANY(items.ancestor_ids))
                )
            ORDER BY items.id
            "#,
            item_table(item_type)
        );

        let ids = sqlx::query_scalar::<_, Uuid>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to list accessible {} items for user '{user_id}' in tenant '{tenant_id}': {error}",
                    item_type.as_str()
                ))
            })?;

        Ok(ids.into_iter().map(ItemId::from_uuid).collect())
    }
}
