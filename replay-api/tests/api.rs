//! HTTP-level tests for the replay API router

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use axum::middleware::from_fn_with_state;
use replay_api::middleware::{throttle_middleware, Throttle, ThrottleConfig};
use replay_api::routes::limit_requests;
use replay_api::{create_router, AppState};
use replay_core::{
    BackendError, BackendResult, ConsoleConfig, ExecutionBackend, ExecutionRequest,
    ExecutionResult,
};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

/// Asks for a number and echoes it back once stdin has one.
struct NumberProgram;

#[async_trait]
impl ExecutionBackend for NumberProgram {
    async fn execute(&self, request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
        if request.program.source.contains("syntax") {
            return Ok(ExecutionResult::CompileFailure {
                output: "main.c:1: error: expected ';'\n".to_string(),
            });
        }
        if request.program.source.contains("offline") {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        let mut output = String::from("Enter a number:\n");
        if let Some(n) = request.stdin.lines().find(|l| !l.is_empty()) {
            output.push_str(&format!("You entered: {}\n", n));
        }
        Ok(ExecutionResult::RunOutput { output })
    }
}

fn app() -> Router {
    create_router(AppState::new(Arc::new(NumberProgram), ConsoleConfig::default()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router) -> String {
    let (status, body) = call(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["phase"], "idle");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn run_body(source: &str) -> Value {
    json!({ "language": "python", "version": "3.10.0", "source": source })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_prompt_then_input_completes() {
    let app = app();
    let id = create(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/run"),
        Some(run_body("n = input('Enter a number:')")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["waiting"], true);
    assert_eq!(body["data"]["phase"], "waiting_for_input");
    assert_eq!(body["data"]["transcript"], json!(["Enter a number:"]));

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/input"),
        Some(json!({ "line": "5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["waiting"], false);
    assert_eq!(body["data"]["phase"], "terminal");
    assert_eq!(body["data"]["outcome"], "completed");
    assert_eq!(
        body["data"]["transcript"],
        json!(["Enter a number:", "You entered: 5"])
    );
}

#[tokio::test]
async fn test_input_after_end_is_conflict() {
    let app = app();
    let id = create(&app).await;
    call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/run"),
        Some(run_body("n = input()")),
    )
    .await;
    call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/input"),
        Some(json!({ "line": "5" })),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/input"),
        Some(json!({ "line": "6" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INPUT_REJECTED");
}

#[tokio::test]
async fn test_input_before_run_is_conflict() {
    let app = app();
    let id = create(&app).await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/input"),
        Some(json!({ "line": "5" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INPUT_REJECTED");
}

#[tokio::test]
async fn test_compile_failure_is_reported_verbatim() {
    let app = app();
    let id = create(&app).await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/run"),
        Some(run_body("syntax")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["failed"], true);
    assert_eq!(body["data"]["outcome"], "compile_error");
    assert_eq!(
        body["data"]["transcript"],
        json!(["main.c:1: error: expected ';'"])
    );
}

#[tokio::test]
async fn test_transport_error_ends_session() {
    let app = app();
    let id = create(&app).await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/sessions/{id}/run"),
        Some(run_body("offline")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "transport_error");
    assert_eq!(body["data"]["transcript"], json!(["Error executing code"]));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app();
    let id = uuid::Uuid::new_v4();
    let (status, body) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_session() {
    let app = app();
    let id = create(&app).await;

    let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_session_limit_refuses_new_sessions() {
    let state =
        AppState::new(Arc::new(NumberProgram), ConsoleConfig::default()).with_max_sessions(2);
    let app = create_router(state);
    let first = create(&app).await;
    create(&app).await;

    let (status, body) = call(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SESSION_LIMIT");

    call(&app, "DELETE", &format!("/api/sessions/{first}"), None).await;
    let (status, _) = call(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_runs_are_throttled_per_session() {
    let throttle = Throttle::new(ThrottleConfig {
        per_second: 100,
        burst: 100,
        session_per_second: 1,
        session_burst: 1,
        enabled: true,
    });
    let app = app().layer(from_fn_with_state(throttle, throttle_middleware));
    let busy = create(&app).await;
    let other = create(&app).await;

    let run = |id: &str| format!("/api/sessions/{id}/run");
    let (status, _) = call(&app, "POST", &run(&busy), Some(run_body("n = input()"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &run(&busy), Some(run_body("n = input()"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let (status, _) = call(&app, "POST", &run(&other), Some(run_body("n = input()"))).await;
    assert_eq!(status, StatusCode::OK);

    // Reads are never throttled
    let (status, _) = call(&app, "GET", &format!("/api/sessions/{busy}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

/// Holds every execution until released.
struct Held {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ExecutionBackend for Held {
    async fn execute(&self, _request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ExecutionResult::RunOutput {
            output: "done\n".to_string(),
        })
    }
}

#[tokio::test]
async fn test_concurrency_limit_spans_routes() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let backend = Held {
        entered: entered.clone(),
        release: release.clone(),
    };
    let state = AppState::new(Arc::new(backend), ConsoleConfig::default());
    let app = limit_requests(create_router(state), 1, 1024);
    let id = create(&app).await;

    let running = {
        let app = app.clone();
        tokio::spawn(async move {
            call(
                &app,
                "POST",
                &format!("/api/sessions/{id}/run"),
                Some(run_body("print('done')")),
            )
            .await
        })
    };
    entered.notified().await;

    // The run holds the only slot, so a different route has to wait
    let health = call(&app, "GET", "/health", None);
    assert!(tokio::time::timeout(Duration::from_millis(100), health).await.is_err());

    release.notify_one();
    let (status, body) = running.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transcript"], json!(["done"]));

    let (status, _) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
