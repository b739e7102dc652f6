//! Request guards: API-key authentication and execution throttling
//!
//! Run and input requests each cost one full program execution on the
//! backend. They draw from a server-wide quota and from a smaller quota of
//! their own session, so one console cannot starve the others. Creating,
//! reading and deleting sessions is never throttled.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use uuid::Uuid;

use crate::models::{ApiError, ApiResponse};

pub const API_KEY_HEADER: &str = "X-API-Key";

pub const ENV_API_KEYS: &str = "REPLAY_API_KEYS";
pub const ENV_RATE_LIMIT: &str = "REPLAY_API_RATE_LIMIT";
pub const ENV_RATE_BURST: &str = "REPLAY_API_RATE_BURST";
pub const ENV_SESSION_RATE_LIMIT: &str = "REPLAY_API_SESSION_RATE_LIMIT";
pub const ENV_SESSION_RATE_BURST: &str = "REPLAY_API_SESSION_RATE_BURST";
pub const ENV_RATE_ENABLED: &str = "REPLAY_API_RATE_ENABLED";

/// Per-session limiter entries kept before idle ones are pruned
const SESSION_KEYS_SOFT_CAP: usize = 4096;

fn is_public(path: &str) -> bool {
    path == "/health" || path.starts_with("/docs") || path.starts_with("/api-docs")
}

/// Session behind `/api/sessions/{id}/run` or `/api/sessions/{id}/input`.
fn executing_session(path: &str) -> Option<Uuid> {
    let (id, action) = path.strip_prefix("/api/sessions/")?.split_once('/')?;
    match action {
        "run" | "input" => id.parse().ok(),
        _ => None,
    }
}

fn reject(status: StatusCode, code: &str, message: &str, help: String) -> Response {
    let body = ApiResponse::<()>::error(ApiError {
        code: code.to_string(),
        message: message.to_string(),
        help: Some(help),
    });
    (status, Json(body)).into_response()
}

// ============================================================================
// API Key Authentication
// ============================================================================

/// Accepted API keys; an empty set turns authentication off
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashSet<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var(ENV_API_KEYS).unwrap_or_default())
    }

    /// Comma-separated list; blanks are skipped
    pub fn parse(list: &str) -> Self {
        Self {
            keys: list
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn accepts(&self, key: Option<&str>) -> bool {
        !self.is_enabled() || key.is_some_and(|k| self.keys.contains(k))
    }
}

pub async fn auth_middleware(
    State(keys): State<Arc<ApiKeys>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if is_public(request.uri().path()) || keys.accepts(key) {
        return next.run(request).await;
    }

    let message = if key.is_some() {
        "Invalid API key"
    } else {
        "API key required"
    };
    reject(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        message,
        format!("Provide a valid API key in the {} header", API_KEY_HEADER),
    )
}

// ============================================================================
// Execution Throttling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Executions per second across all sessions
    pub per_second: u32,
    pub burst: u32,
    /// Executions per second for a single session
    pub session_per_second: u32,
    pub session_burst: u32,
    pub enabled: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            per_second: 5,
            burst: 10,
            session_per_second: 2,
            session_burst: 4,
            enabled: true,
        }
    }
}

impl ThrottleConfig {
    pub fn from_env() -> Self {
        Self::default().with_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`; unparsable values keep the current one
    pub fn with_lookup(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, current: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(current)
        };
        Self {
            per_second: number(ENV_RATE_LIMIT, self.per_second),
            burst: number(ENV_RATE_BURST, self.burst),
            session_per_second: number(ENV_SESSION_RATE_LIMIT, self.session_per_second),
            session_burst: number(ENV_SESSION_RATE_BURST, self.session_burst),
            enabled: lookup(ENV_RATE_ENABLED)
                .map(|v| !matches!(v.trim(), "false" | "0"))
                .unwrap_or(self.enabled),
        }
    }
}

fn quota(per_second: u32, burst: u32) -> Quota {
    let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(per_second).allow_burst(burst)
}

/// Which quota turned a request away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    Server,
    Session,
}

#[derive(Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    server: Arc<DefaultDirectRateLimiter>,
    sessions: Arc<DefaultKeyedRateLimiter<Uuid>>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            server: Arc::new(RateLimiter::direct(quota(config.per_second, config.burst))),
            sessions: Arc::new(RateLimiter::keyed(quota(
                config.session_per_second,
                config.session_burst,
            ))),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Take one execution slot for `session`
    pub fn admit(&self, session: Uuid) -> Result<(), Exhausted> {
        if !self.config.enabled {
            return Ok(());
        }
        if self.sessions.len() > SESSION_KEYS_SOFT_CAP {
            self.sessions.retain_recent();
        }
        self.sessions
            .check_key(&session)
            .map_err(|_| Exhausted::Session)?;
        self.server.check().map_err(|_| Exhausted::Server)
    }
}

pub async fn throttle_middleware(
    State(throttle): State<Throttle>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(session) = executing_session(request.uri().path()) else {
        return next.run(request).await;
    };

    match throttle.admit(session) {
        Ok(()) => next.run(request).await,
        Err(scope) => {
            tracing::warn!(%session, ?scope, "execution throttled");
            let config = throttle.config();
            let (message, help) = match scope {
                Exhausted::Session => (
                    "Too many executions for this session",
                    format!(
                        "Per-session limit: {} executions/second, burst: {}",
                        config.session_per_second, config.session_burst
                    ),
                ),
                Exhausted::Server => (
                    "Too many executions",
                    format!(
                        "Server limit: {} executions/second, burst: {}",
                        config.per_second, config.burst
                    ),
                ),
            };
            reject(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message, help)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_key_list_parsing() {
        let keys = ApiKeys::parse(" alpha, ,beta ");
        assert!(keys.is_enabled());
        assert_eq!(keys.len(), 2);
        assert!(keys.accepts(Some("beta")));
        assert!(!keys.accepts(Some("gamma")));
        assert!(!keys.accepts(None));
    }

    #[test]
    fn test_empty_key_list_disables_auth() {
        let keys = ApiKeys::parse("");
        assert!(keys.is_empty());
        assert!(keys.accepts(None));
    }

    #[test]
    fn test_executing_session_paths() {
        let id = Uuid::new_v4();
        assert_eq!(executing_session(&format!("/api/sessions/{id}/run")), Some(id));
        assert_eq!(executing_session(&format!("/api/sessions/{id}/input")), Some(id));
        assert_eq!(executing_session(&format!("/api/sessions/{id}")), None);
        assert_eq!(executing_session("/api/sessions"), None);
        assert_eq!(executing_session("/api/sessions/not-a-uuid/run"), None);
    }

    #[test]
    fn test_session_quota_is_per_session() {
        let throttle = Throttle::new(ThrottleConfig {
            per_second: 100,
            burst: 100,
            session_per_second: 1,
            session_burst: 1,
            enabled: true,
        });
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(throttle.admit(a), Ok(()));
        assert_eq!(throttle.admit(a), Err(Exhausted::Session));
        assert_eq!(throttle.admit(b), Ok(()));
    }

    #[test]
    fn test_server_quota_spans_sessions() {
        let throttle = Throttle::new(ThrottleConfig {
            per_second: 1,
            burst: 2,
            session_per_second: 10,
            session_burst: 10,
            enabled: true,
        });

        assert_eq!(throttle.admit(Uuid::new_v4()), Ok(()));
        assert_eq!(throttle.admit(Uuid::new_v4()), Ok(()));
        assert_eq!(throttle.admit(Uuid::new_v4()), Err(Exhausted::Server));
    }

    #[test]
    fn test_disabled_throttle_admits_everything() {
        let throttle = Throttle::new(ThrottleConfig {
            session_burst: 1,
            enabled: false,
            ..Default::default()
        });
        let id = Uuid::new_v4();
        for _ in 0..10 {
            assert_eq!(throttle.admit(id), Ok(()));
        }
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        let throttle = Throttle::new(ThrottleConfig {
            per_second: 0,
            burst: 0,
            session_per_second: 0,
            session_burst: 0,
            enabled: true,
        });
        assert_eq!(throttle.admit(Uuid::nil()), Ok(()));
        assert!(throttle.admit(Uuid::nil()).is_err());
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_RATE_LIMIT, "20"),
            (ENV_SESSION_RATE_BURST, " 8 "),
            (ENV_RATE_BURST, "lots"),
            (ENV_RATE_ENABLED, "0"),
        ]
        .into_iter()
        .collect();
        let config =
            ThrottleConfig::default().with_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.per_second, 20);
        assert_eq!(config.session_burst, 8);
        assert_eq!(config.burst, ThrottleConfig::default().burst);
        assert!(!config.enabled);
    }
}
