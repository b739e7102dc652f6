//! Request handlers for API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use replay_core::Dispatch;
use uuid::Uuid;

use crate::models::*;
use crate::state::{AppState, SessionError};

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn failure<T>(err: SessionError) -> Reply<T> {
    (err.status(), Json(ApiResponse::error(err.to_api())))
}

fn settle(id: Uuid, dispatch: Dispatch) -> Reply<SessionView> {
    match dispatch {
        Dispatch::Applied(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::success(SessionView::new(id, snapshot))),
        ),
        Dispatch::Superseded => failure(SessionError::Superseded),
        Dispatch::Ignored(reason) => failure(SessionError::InputRejected(reason)),
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// Create an idle console session
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    responses(
        (status = 201, description = "Session created", body = SessionView),
        (status = 503, description = "Session limit reached", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn create_session_handler(State(state): State<AppState>) -> Reply<SessionView> {
    let (id, console) = match state.create().await {
        Ok(created) => created,
        Err(err) => {
            tracing::warn!(%err, "session refused");
            return failure(err);
        }
    };
    tracing::info!(%id, "session created");
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(SessionView::new(id, console.snapshot().await))),
    )
}

/// Current console state of a session
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session state", body = SessionView),
        (status = 404, description = "Unknown session", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<SessionView> {
    match state.get(id).await {
        Ok(console) => (
            StatusCode::OK,
            Json(ApiResponse::success(SessionView::new(id, console.snapshot().await))),
        ),
        Err(err) => failure(err),
    }
}

/// Drop a session and its transcript
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session removed"),
        (status = 404, description = "Unknown session", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<()> {
    match state.remove(id).await {
        Ok(()) => {
            tracing::info!(%id, "session removed");
            (StatusCode::OK, Json(ApiResponse::success(())))
        }
        Err(err) => failure(err),
    }
}

/// Start a fresh run, discarding the session's previous transcript and input
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/run",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = RunRequest,
    responses(
        (status = 200, description = "Run finished or is waiting for input", body = SessionView),
        (status = 404, description = "Unknown session", body = ApiError),
        (status = 409, description = "A newer run replaced this one", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn run_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RunRequest>,
) -> Reply<SessionView> {
    let console = match state.get(id).await {
        Ok(console) => console,
        Err(err) => return failure(err),
    };
    tracing::info!(%id, language = %req.language, version = %req.version, "run requested");
    settle(id, console.start_session(req.into()).await)
}

/// Submit one line of input and re-run with the whole input history
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/input",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = InputRequest,
    responses(
        (status = 200, description = "Input applied", body = SessionView),
        (status = 404, description = "Unknown session", body = ApiError),
        (status = 409, description = "The session is not waiting for input", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn input_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InputRequest>,
) -> Reply<SessionView> {
    let console = match state.get(id).await {
        Ok(console) => console,
        Err(err) => return failure(err),
    };
    settle(id, console.submit_input(req.line).await)
}

/// Health check endpoint for monitoring
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthCheck),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.len().await,
    })
}
