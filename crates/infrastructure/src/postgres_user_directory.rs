use async_trait::async_trait;
use sqlx::PgPool;

use lattica_application::UserDirectory;
use lattica_core::{AppError, AppResult, TenantId};
use lattica_domain::UserId;

/// PostgreSQL-backed user existence checks.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn user_exists(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users
                WHERE tenant_id = $1 AND id = $2
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to resolve user '{user_id}' in tenant '{tenant_id}': {error}"
            ))
        })
    }
}
