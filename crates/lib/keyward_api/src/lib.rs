//! # keyward_api
//!
//! HTTP API library for Keyward.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use keyward_core::auth::AuthError;
use keyward_core::auth::queries::PgStore;
use keyward_core::auth::session::SessionManager;
use keyward_core::clock::SystemClock;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::auth;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Login, refresh and current-user logic over the configured store.
    pub sessions: Arc<SessionManager>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State backed by PostgreSQL and the system clock.
    pub fn postgres(pool: PgPool, config: ApiConfig) -> Result<Self, AuthError> {
        let sessions = SessionManager::with_store(
            &config.auth,
            Arc::new(PgStore::new(pool)),
            Arc::new(SystemClock),
        )?;
        Ok(Self {
            sessions: Arc::new(sessions),
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `keyward_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    keyward_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_REGISTRATION, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Protected routes (require an active user's access token)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(routes::GET_AUTH_SESSIONS, get(auth::sessions_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
