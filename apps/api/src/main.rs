//! Lattica API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use lattica_application::{
    AuthorizationGate, GrantEngine, HierarchyProvider, PermissionResolver, PermissionStore,
};
use lattica_core::AppError;
use lattica_infrastructure::{
    PostgresAuditRepository, PostgresHierarchyProvider, PostgresPermissionStore,
    PostgresUserDirectory,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let permission_store: Arc<dyn PermissionStore> =
        Arc::new(PostgresPermissionStore::new(pool.clone()));
    let hierarchy: Arc<dyn HierarchyProvider> =
        Arc::new(PostgresHierarchyProvider::new(pool.clone()));
    let user_directory = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));

    let resolver = PermissionResolver::new(permission_store.clone(), hierarchy.clone());
    let authorization_gate = AuthorizationGate::new(resolver, permission_store.clone());
    let grant_engine = GrantEngine::new(
        permission_store,
        hierarchy,
        user_directory,
        audit_repository,
    );

    let app_state = AppState {
        grant_engine,
        authorization_gate,
        pool,
    };

    let access_routes = Router::new()
        .route(
            "/api/access/grants",
            post(handlers::access::grant_permission_handler)
                .put(handlers::access::update_permission_handler),
        )
        .route(
            "/api/access/grant-revocations",
            post(handlers::access::revoke_permission_handler),
        )
        .route(
            "/api/access/checks",
            post(handlers::access::check_permission_handler),
        )
        .route(
            "/api/access/masks",
            post(handlers::access::effective_mask_handler),
        )
        .route(
            "/api/access/masks/batch",
            post(handlers::access::batch_effective_masks_handler),
        )
        .route(
            "/api/access/accessible-items",
            get(handlers::access::accessible_items_handler),
        )
        .route_layer(from_fn(middleware::require_actor));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(access_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "lattica-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
