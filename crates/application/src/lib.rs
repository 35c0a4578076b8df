//! Application services and ports for the access-control engine.

#![forbid(unsafe_code)]

mod access_ports;
mod authorization_gate;
mod grant_engine;
mod permission_resolver;

pub use access_ports::{
    AuditEvent, AuditRepository, GrantUpsert, HierarchyProvider, PermissionGrant, PermissionStore,
    UserDirectory,
};
pub use authorization_gate::{AccessibleItem, AuthorizationGate};
pub use grant_engine::{
    GrantEngine, GrantOutcome, GrantPermissionInput, RevokePermissionInput, UpdatePermissionInput,
};
pub use permission_resolver::PermissionResolver;
