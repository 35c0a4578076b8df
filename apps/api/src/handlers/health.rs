use axum::Json;
use axum::extract::State;
use lattica_core::AppError;
use serde::Serialize;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::state::AppState;

/// Liveness payload with a database reachability check.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health_handler(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|error| AppError::Internal(format!("database health check failed: {error}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_owned(),
    }))
}
