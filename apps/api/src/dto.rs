//! Transport payloads for the HTTP API.

mod access;

pub use access::{
    AccessibleItemResponse, AccessibleItemsQuery, BatchEffectiveMaskRequest,
    BatchEffectiveMaskResponse, EffectiveMaskRequest, EffectiveMaskResponse, GrantOutcomeResponse,
    GrantPermissionRequest, PermissionCheckRequest, PermissionCheckResponse,
    PermissionGrantResponse, RevokePermissionRequest, UpdatePermissionRequest, parse_item_ref,
};
