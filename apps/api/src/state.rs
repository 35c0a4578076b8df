use lattica_application::{AuthorizationGate, GrantEngine};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub grant_engine: GrantEngine,
    pub authorization_gate: AuthorizationGate,
    pub pool: PgPool,
}
