use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

/// User information supplied by the upstream authentication layer.
///
/// Lattica does not issue or validate credentials itself; every request is
/// expected to arrive with an already-verified identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: Uuid,
    display_name: String,
    tenant_id: TenantId,
}

impl UserIdentity {
    /// Creates a user identity from authentication and tenancy data.
    #[must_use]
    pub fn new(user_id: Uuid, display_name: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            tenant_id,
        }
    }

    /// Returns the stable user identifier from the identity provider.
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
