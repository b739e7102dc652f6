//! Route configuration for the replay API

use axum::{
    routing::{get, post},
    Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(handlers::create_session_handler))
        .route(
            "/api/sessions/:id",
            get(handlers::get_session_handler).delete(handlers::delete_session_handler),
        )

        // Console actions
        .route("/api/sessions/:id/run", post(handlers::run_handler))
        .route("/api/sessions/:id/input", post(handlers::input_handler))

        // Health check
        .route("/health", get(handlers::health_handler))
        .with_state(state)
}

/// Source files and input lines are small; anything past this is refused.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Server-wide request limits. `axum` layers every route separately, so the
/// concurrency limit must be the global variant to share one semaphore.
pub fn limit_requests(router: Router, max_concurrent: usize, max_body_bytes: usize) -> Router {
    router
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent.max(1)))
}
