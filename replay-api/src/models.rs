//! Data models for API requests and responses

use replay_core::{ConsoleSnapshot, Phase, Program, Termination};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Request Models
// ============================================================================

/// Request body for starting a run
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunRequest {
    /// Backend language name
    #[schema(example = "python")]
    pub language: String,

    /// Language version ("*" for the newest installed)
    #[serde(default = "default_version")]
    #[schema(example = "3.10.0")]
    pub version: String,

    /// Full program source
    #[schema(example = "n = input('Enter a number:\\n')\nprint('You entered:', n)")]
    pub source: String,
}

fn default_version() -> String {
    "*".to_string()
}

impl From<RunRequest> for Program {
    fn from(req: RunRequest) -> Self {
        Program::new(req.language, req.version, req.source)
    }
}

/// Request body for submitting a line of input
#[derive(Debug, Deserialize, ToSchema)]
pub struct InputRequest {
    /// The line typed by the user, without a trailing newline
    #[schema(example = "5")]
    pub line: String,
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded
    pub success: bool,

    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error information in API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code (e.g., "SESSION_NOT_FOUND", "INPUT_REJECTED")
    #[schema(example = "INPUT_REJECTED")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "the session has ended; start a new run")]
    pub message: String,

    /// Helpful suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Console state of one session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionView {
    /// Session identifier
    pub id: Uuid,

    /// Run counter; bumps on every run request
    #[schema(example = 1)]
    pub generation: u64,

    /// Lines to display, replacing any previously shown transcript
    pub transcript: Vec<String>,

    /// The program is blocked on a prompt
    pub waiting: bool,

    /// A backend call is in flight
    pub running: bool,

    /// The session ended in a failure
    pub failed: bool,

    /// idle | running | waiting_for_input | terminal
    #[schema(example = "waiting_for_input")]
    pub phase: String,

    /// How a terminal session ended
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "completed")]
    pub outcome: Option<String>,
}

impl SessionView {
    pub fn new(id: Uuid, snapshot: ConsoleSnapshot) -> Self {
        let (phase, outcome) = match snapshot.phase {
            Phase::Idle => ("idle", None),
            Phase::Running => ("running", None),
            Phase::WaitingForInput => ("waiting_for_input", None),
            Phase::Terminal(t) => ("terminal", Some(termination_name(t))),
        };
        Self {
            id,
            generation: snapshot.generation,
            transcript: snapshot.transcript,
            waiting: snapshot.waiting,
            running: snapshot.running,
            failed: snapshot.failed,
            phase: phase.to_string(),
            outcome: outcome.map(str::to_string),
        }
    }
}

fn termination_name(termination: Termination) -> &'static str {
    match termination {
        Termination::Completed => "completed",
        Termination::RuntimeError => "runtime_error",
        Termination::CompileError => "compile_error",
        Termination::TransportError => "transport_error",
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheck {
    /// Service status
    #[schema(example = "healthy")]
    pub status: String,

    /// Service version
    #[schema(example = "2026.10.1")]
    pub version: String,

    /// Number of live console sessions
    #[schema(example = 3)]
    pub sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_default_version() {
        let req: RunRequest =
            serde_json::from_str(r#"{"language":"python","source":"print(1)"}"#).unwrap();
        assert_eq!(req.version, "*");
        let program = Program::from(req);
        assert_eq!(program.language, "python");
    }

    #[test]
    fn test_view_of_terminal_snapshot() {
        let snapshot = ConsoleSnapshot {
            generation: 2,
            transcript: vec!["error: ...".into()],
            waiting: false,
            running: false,
            failed: true,
            phase: Phase::Terminal(Termination::CompileError),
        };
        let view = SessionView::new(Uuid::nil(), snapshot);
        assert_eq!(view.phase, "terminal");
        assert_eq!(view.outcome.as_deref(), Some("compile_error"));
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let body = ApiResponse::<()>::error(ApiError {
            code: "SESSION_NOT_FOUND".into(),
            message: "missing".into(),
            help: None,
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert!(json["error"].get("help").is_none());
    }
}
