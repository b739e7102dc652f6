//! Execution orchestrator
//!
//! [`Console`] owns the session and drives every backend call. The session
//! lock is only held to prepare a call and to apply its outcome, never across
//! the backend await, so a new run can start while an old call is still in
//! flight. The old call's result is then dropped by the generation check.

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::backend::{ExecutionBackend, Program, ResourceLimits};
use crate::config::ConsoleConfig;
use crate::revealer::Revealer;
use crate::session::{ConsoleSnapshot, InputRejected, PendingCall, Session};

/// What happened to a console action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The backend answered and the session was updated
    Applied(ConsoleSnapshot),
    /// A newer run started while the call was in flight; its answer was dropped
    Superseded,
    /// Nothing was sent; the session is unchanged
    Ignored(InputRejected),
}

impl Dispatch {
    pub fn snapshot(&self) -> Option<&ConsoleSnapshot> {
        match self {
            Dispatch::Applied(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

pub struct Console<B> {
    backend: B,
    revealer: Revealer,
    limits: ResourceLimits,
    error_line: String,
    session: Mutex<Session>,
}

impl<B: ExecutionBackend> Console<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &ConsoleConfig::default())
    }

    pub fn with_config(backend: B, config: &ConsoleConfig) -> Self {
        Self {
            backend,
            revealer: Revealer::new(config.markers.clone()),
            limits: config.limits,
            error_line: config.error_line.clone(),
            session: Mutex::new(Session::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn snapshot(&self) -> ConsoleSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Start a fresh session for `program` and run it with empty stdin.
    pub async fn start_session(&self, program: Program) -> Dispatch {
        let call = {
            let mut session = self.session.lock().await;
            session.begin(program, self.limits)
        };
        debug!(
            generation = call.generation,
            language = %call.request.program.language,
            version = %call.request.program.version,
            "session started"
        );
        self.dispatch(call).await
    }

    /// Submit one line of input and re-run with the whole stdin history.
    ///
    /// Ignored unless the session is waiting for input.
    pub async fn submit_input(&self, line: impl Into<String>) -> Dispatch {
        let call = {
            let mut session = self.session.lock().await;
            match session.accept_input(line.into(), self.limits) {
                Ok(call) => call,
                Err(reason) => {
                    warn!(generation = session.generation(), %reason, "input ignored");
                    return Dispatch::Ignored(reason);
                }
            }
        };
        self.dispatch(call).await
    }

    async fn dispatch(&self, call: PendingCall) -> Dispatch {
        let PendingCall {
            generation,
            request,
        } = call;
        debug!(
            generation,
            stdin_lines = request.stdin.lines().count(),
            "calling backend"
        );

        let outcome = self.backend.execute(&request).await;
        if let Err(err) = &outcome {
            error!(generation, %err, "backend call failed");
        }

        let mut session = self.session.lock().await;
        if session.apply(generation, outcome, &self.revealer, &self.error_line) {
            let snapshot = session.snapshot();
            debug!(
                generation,
                phase = ?snapshot.phase,
                lines = snapshot.transcript.len(),
                "backend result applied"
            );
            Dispatch::Applied(snapshot)
        } else {
            warn!(
                generation,
                current = session.generation(),
                "discarding response from an abandoned session"
            );
            Dispatch::Superseded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ExecutionRequest, ExecutionResult};
    use crate::error::{BackendError, BackendResult};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ExecutionBackend for Echo {
        async fn execute(&self, request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
            Ok(ExecutionResult::RunOutput {
                output: format!("Enter text:\n{}\n", request.stdin),
            })
        }
    }

    struct Down;

    #[async_trait]
    impl ExecutionBackend for Down {
        async fn execute(&self, _request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
            Err(BackendError::Transport("connection refused".into()))
        }
    }

    fn program() -> Program {
        Program::new("python", "3.10.0", "print(input('Enter text:\\n'))")
    }

    #[tokio::test]
    async fn test_start_and_answer() {
        let console = Console::new(Echo);
        let started = console.start_session(program()).await;
        let snapshot = started.snapshot().unwrap();
        assert!(snapshot.waiting);
        assert_eq!(snapshot.transcript, vec!["Enter text:"]);

        let answered = console.submit_input("hi").await;
        let snapshot = answered.snapshot().unwrap();
        assert!(!snapshot.waiting);
        assert!(!snapshot.failed);
        assert_eq!(snapshot.transcript, vec!["Enter text:", "hi"]);
    }

    #[tokio::test]
    async fn test_submit_before_run_is_ignored() {
        let console = Console::new(Echo);
        assert_eq!(
            console.submit_input("x").await,
            Dispatch::Ignored(InputRejected::NoSession)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_on_first_run() {
        let console = Console::new(Down);
        let snapshot = console.start_session(program()).await;
        let snapshot = snapshot.snapshot().unwrap();
        assert_eq!(snapshot.transcript, vec!["Error executing code"]);
        assert!(snapshot.failed);
        assert!(!snapshot.waiting);
        assert!(!snapshot.running);
    }

    #[tokio::test]
    async fn test_custom_error_line() {
        let config = ConsoleConfig {
            error_line: "backend offline".into(),
            ..Default::default()
        };
        let console = Console::with_config(Down, &config);
        console.start_session(program()).await;
        assert_eq!(console.snapshot().await.transcript, vec!["backend offline"]);
    }
}
