use super::*;

impl PostgresPermissionStore {
    pub(super) async fn merge_grant_impl(
        &self,
        grant: GrantUpsert,
        prune_candidates: &[ItemId],
    ) -> AppResult<PermissionGrant> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to begin grant transaction for tenant '{}': {error}",
                grant.tenant_id
            ))
        })?;

        if !prune_candidates.is_empty() {
            let prune_ids: Vec<Uuid> = prune_candidates
                .iter()
                .map(|item_id| item_id.as_uuid())
                .collect();

            let pruned = sqlx::query(
                r#"
                DELETE FROM permission_grants
                WHERE tenant_id = $1
                    AND user_id = $2
                    AND item_id = ANY($3)
                    AND (permission_mask | $4) = $4
                "#,
            )
            .bind(grant.tenant_id.as_uuid())
            .bind(grant.user_id.as_uuid())
            .bind(&prune_ids)
            .bind(i16::from(grant.mask.bits()))
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to prune shadowed grants for user '{}' in tenant '{}': {error}",
                    grant.user_id, grant.tenant_id
                ))
            })?
            .rows_affected();

            if pruned > 0 {
                tracing::debug!(
                    pruned,
                    user_id = %grant.user_id,
                    item_id = %grant.item.id,
                    "pruned shadowed descendant grants"
                );
            }
        }

        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            INSERT INTO permission_grants (tenant_id, user_id, item_id, item_type, permission_mask)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, item_id, item_type)
            DO UPDATE SET permission_mask = permission_grants.permission_mask | EXCLUDED.permission_mask
            RETURNING
                user_id,
                tenant_id,
                item_id,
                item_type,
                permission_mask,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            "#,
        )
        .bind(grant.tenant_id.as_uuid())
        .bind(grant.user_id.as_uuid())
        .bind(grant.item.id.as_uuid())
        .bind(grant.item.item_type.as_str())
        .bind(i16::from(grant.mask.bits()))
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert grant for user '{}' on {} '{}' in tenant '{}': {error}",
                grant.user_id, grant.item.item_type, grant.item.id, grant.tenant_id
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit grant transaction for tenant '{}': {error}",
                grant.tenant_id
            ))
        })?;

        row.into_grant()
    }

    pub(super) async fn replace_grant_mask_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        mask: PermissionMask,
    ) -> AppResult<PermissionGrant> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            UPDATE permission_grants
            SET permission_mask = $5
            WHERE tenant_id = $1
                AND user_id = $2
                AND item_id = $3
                AND item_type = $4
            RETURNING
                user_id,
                tenant_id,
                item_id,
                item_type,
                permission_mask,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(item.id.as_uuid())
        .bind(item.item_type.as_str())
        .bind(i16::from(mask.bits()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to replace grant mask for user '{user_id}' on {} '{}' in tenant '{tenant_id}': {error}",
                item.item_type, item.id
            ))
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "grant for user '{user_id}' on {} '{}' was not found",
                item.item_type, item.id
            ))
        })?;

        row.into_grant()
    }

    pub(super) async fn delete_grant_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM permission_grants
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
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete grant for user '{user_id}' on {} '{}' in tenant '{tenant_id}': {error}",
                item.item_type, item.id
            ))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "grant for user '{user_id}' on {} '{}' was not found",
                item.item_type, item.id
            )));
        }

        Ok(())
    }
}
