use async_trait::async_trait;
use lattica_core::{AppResult, TenantId};
use lattica_domain::UserId;

/// Port for user existence checks.
///
/// User lifecycle (registration, credentials, profile) is owned by an
/// external collaborator; the grant engine only needs to know whether a
/// target user exists in the tenant.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns whether the user exists in the tenant.
    async fn user_exists(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<bool>;
}
