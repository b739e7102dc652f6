//! Shared server state: the backend and the live console sessions

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use replay_core::{Console, ConsoleConfig, ExecutionBackend, InputRejected};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::ApiError;

pub type SharedBackend = Arc<dyn ExecutionBackend>;
pub type SharedConsole = Arc<Console<SharedBackend>>;

/// Live sessions kept before `create` starts refusing new ones
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Clone)]
pub struct AppState {
    backend: SharedBackend,
    config: Arc<ConsoleConfig>,
    sessions: Arc<RwLock<HashMap<Uuid, SharedConsole>>>,
    max_sessions: usize,
}

impl AppState {
    pub fn new(backend: SharedBackend, config: ConsoleConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Cap the number of live sessions; zero counts as one
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Register a fresh, idle console
    pub async fn create(&self) -> Result<(Uuid, SharedConsole), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Full(self.max_sessions));
        }
        let id = Uuid::new_v4();
        let console = Arc::new(Console::with_config(self.backend.clone(), &self.config));
        sessions.insert(id, console.clone());
        Ok((id, console))
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedConsole, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session-level request failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Input rejected: {0}")]
    InputRejected(#[from] InputRejected),

    #[error("A newer run replaced this one before it finished")]
    Superseded,

    #[error("Session limit reached ({0} live sessions)")]
    Full(usize),
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::InputRejected(_) | SessionError::Superseded => StatusCode::CONFLICT,
            SessionError::Full(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn to_api(&self) -> ApiError {
        let (code, help) = match self {
            SessionError::NotFound(_) => (
                "SESSION_NOT_FOUND",
                Some("Create a session with POST /api/sessions"),
            ),
            SessionError::InputRejected(InputRejected::NoSession) => (
                "INPUT_REJECTED",
                Some("Start a run before sending input"),
            ),
            SessionError::InputRejected(InputRejected::Busy) => (
                "INPUT_REJECTED",
                Some("Wait for the current run to finish"),
            ),
            SessionError::InputRejected(InputRejected::Ended) => (
                "INPUT_REJECTED",
                Some("Start a new run to continue"),
            ),
            SessionError::Superseded => ("SUPERSEDED", None),
            SessionError::Full(_) => (
                "SESSION_LIMIT",
                Some("Delete finished sessions with DELETE /api/sessions/{id}"),
            ),
        };
        ApiError {
            code: code.to_string(),
            message: self.to_string(),
            help: help.map(str::to_string),
        }
    }
}
