use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use lattica_core::{AppError, TenantId, UserIdentity};
use uuid::Uuid;

use crate::error::ApiResult;

/// Builds the acting identity from headers set by the upstream auth layer.
///
/// Lattica trusts the gateway in front of it to have validated credentials;
/// requests reaching the access routes without identity headers are rejected.
pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let user_id = header_uuid(headers, "x-user-id")?;
    let tenant_id = header_uuid(headers, "x-tenant-id")?;
    let display_name = headers
        .get("x-display-name")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();

    Ok(UserIdentity::new(
        user_id,
        display_name,
        TenantId::from_uuid(tenant_id),
    ))
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Uuid, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("missing or invalid '{name}' identity header"))
        })
}
