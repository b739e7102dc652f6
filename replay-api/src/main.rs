//! Replay REST API Server
//!
//! ## Environment Variables
//! - `REPLAY_API_HOST`: Host to bind to (default: 127.0.0.1)
//! - `REPLAY_API_PORT`: Port to listen on (default: 3000)
//! - `REPLAY_API_KEYS`: Comma-separated list of valid API keys (empty = no auth)
//! - `REPLAY_API_RATE_LIMIT`: Executions per second, all sessions (default: 5)
//! - `REPLAY_API_RATE_BURST`: Burst size, all sessions (default: 10)
//! - `REPLAY_API_SESSION_RATE_LIMIT`: Executions per second, one session (default: 2)
//! - `REPLAY_API_SESSION_RATE_BURST`: Burst size, one session (default: 4)
//! - `REPLAY_API_RATE_ENABLED`: Enable throttling (default: true)
//! - `REPLAY_API_MAX_SESSIONS`: Live sessions before new ones are refused (default: 1024)
//! - `REPLAY_CONFIG`, `REPLAY_PISTON_URL`, ...: console configuration

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::middleware as axum_middleware;
use clap::Parser;
use replay_core::{ConsoleConfig, PistonClient};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use replay_api::middleware::{
    auth_middleware, throttle_middleware, ApiKeys, Throttle, ThrottleConfig,
};
use replay_api::openapi::ApiDoc;
use replay_api::routes::{limit_requests, MAX_BODY_BYTES};
use replay_api::state::DEFAULT_MAX_SESSIONS;
use replay_api::{create_router, AppState};

#[derive(Parser)]
#[command(name = "replay-api")]
#[command(author = "Replay Contributors")]
#[command(version = "2026.10.1")]
#[command(about = "REST API server for replay console sessions", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "REPLAY_API_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "REPLAY_API_PORT")]
    port: u16,

    /// TOML console configuration
    #[arg(short, long, env = "REPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable CORS for all origins
    #[arg(long, default_value_t = false)]
    cors: bool,

    /// Disable execution throttling
    #[arg(long, default_value_t = false)]
    no_rate_limit: bool,

    /// Live sessions kept before new ones are refused
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS, env = "REPLAY_API_MAX_SESSIONS")]
    max_sessions: usize,

    /// Maximum requests handled at once; each run or input holds one slot
    /// for a full backend round trip
    #[arg(long, default_value_t = 64)]
    max_concurrent: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replay_api=info,replay_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let console_config = match &args.config {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConsoleConfig::default(),
    }
    .with_env()?;

    let api_keys = Arc::new(ApiKeys::from_env());
    let mut throttle_config = ThrottleConfig::from_env();
    if args.no_rate_limit {
        throttle_config.enabled = false;
    }
    let throttle = Throttle::new(throttle_config);

    let backend = Arc::new(PistonClient::from_config(&console_config));
    let state =
        AppState::new(backend, console_config.clone()).with_max_sessions(args.max_sessions);
    let max_sessions = state.max_sessions();

    let mut app = create_router(state);

    // Add Swagger UI
    app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Add execution throttling
    app = app.layer(axum_middleware::from_fn_with_state(
        throttle,
        throttle_middleware,
    ));

    // Add authentication middleware
    app = app.layer(axum_middleware::from_fn_with_state(
        api_keys.clone(),
        auth_middleware,
    ));

    app = limit_requests(app, args.max_concurrent, MAX_BODY_BYTES);

    // Add CORS if enabled
    if args.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Add tracing layer
    app = app.layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid address {}:{}", args.host, args.port))?;

    tracing::info!("Replay API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/docs", addr);
    tracing::info!("Execution backend: {}", console_config.endpoint);
    tracing::info!(
        "Limits: compile {} ms, run {} ms",
        console_config.limits.compile_timeout_ms,
        console_config.limits.run_timeout_ms
    );
    tracing::info!("  Session limit: {}", max_sessions);
    tracing::info!(
        "  Authentication: {}",
        if api_keys.is_enabled() {
            format!("{} API keys configured", api_keys.len())
        } else {
            "disabled".to_string()
        }
    );
    tracing::info!(
        "  Throttling: {}",
        if throttle_config.enabled {
            format!(
                "{}/s (burst {}) server-wide, {}/s (burst {}) per session",
                throttle_config.per_second,
                throttle_config.burst,
                throttle_config.session_per_second,
                throttle_config.session_burst
            )
        } else {
            "disabled".to_string()
        }
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
