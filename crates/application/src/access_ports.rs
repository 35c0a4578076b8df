//! Ports consumed by the access-control services.

mod audit;
mod hierarchy;
mod store;
mod users;

pub use audit::{AuditEvent, AuditRepository};
pub use hierarchy::HierarchyProvider;
pub use store::{GrantUpsert, PermissionGrant, PermissionStore};
pub use users::UserDirectory;
