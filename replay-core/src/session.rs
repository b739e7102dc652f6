//! Session state
//!
//! A [`Session`] is one run-to-terminal lifecycle: the initial run plus every
//! input round trip. All fields change together through the transition
//! methods below, so `waiting`, `running` and `failed` can never disagree.

use serde::Serialize;
use thiserror::Error;

use crate::backend::{ExecutionRequest, ExecutionResult, Program, ResourceLimits};
use crate::error::BackendResult;
use crate::revealer::Revealer;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Ran to the end without an open prompt
    Completed,
    /// Run output contained an error marker
    RuntimeError,
    /// The compile stage failed
    CompileError,
    /// The backend call itself failed
    TransportError,
}

impl Termination {
    pub fn is_failure(self) -> bool {
        !matches!(self, Termination::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum Phase {
    /// No run has been requested yet
    #[default]
    Idle,
    /// A backend call is in flight
    Running,
    /// Blocked on a prompt, ready for a line of input
    WaitingForInput,
    /// Finished; only a new run leaves this phase
    Terminal(Termination),
}

/// Why a line of input was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRejected {
    #[error("no session has been started")]
    NoSession,
    #[error("a backend call is already in flight")]
    Busy,
    #[error("the session has ended; start a new run")]
    Ended,
}

/// A backend call prepared under the session lock.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub generation: u64,
    pub request: ExecutionRequest,
}

/// Observable console state for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleSnapshot {
    pub generation: u64,
    pub transcript: Vec<String>,
    pub waiting: bool,
    pub running: bool,
    pub failed: bool,
    pub phase: Phase,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    generation: u64,
    program: Option<Program>,
    stdin_buffer: Vec<String>,
    transcript: Vec<String>,
    phase: Phase,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn stdin_buffer(&self) -> &[String] {
        &self.stdin_buffer
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_waiting(&self) -> bool {
        self.phase == Phase::WaitingForInput
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.phase, Phase::Terminal(t) if t.is_failure())
    }

    /// Start a fresh run, discarding the previous buffers and transcript.
    ///
    /// Bumping the generation invalidates any call still in flight.
    pub fn begin(&mut self, program: Program, limits: ResourceLimits) -> PendingCall {
        self.generation += 1;
        self.stdin_buffer.clear();
        self.transcript.clear();
        self.program = Some(program.clone());
        self.phase = Phase::Running;
        self.pending(program, limits)
    }

    /// Accept one line of input and echo it into the transcript.
    ///
    /// Leaves the session untouched unless it is waiting for input.
    pub fn accept_input(
        &mut self,
        line: String,
        limits: ResourceLimits,
    ) -> Result<PendingCall, InputRejected> {
        match self.phase {
            Phase::WaitingForInput => {}
            Phase::Idle => return Err(InputRejected::NoSession),
            Phase::Running => return Err(InputRejected::Busy),
            Phase::Terminal(_) => return Err(InputRejected::Ended),
        }
        let Some(program) = self.program.clone() else {
            return Err(InputRejected::NoSession);
        };

        self.transcript.push(line.clone());
        self.stdin_buffer.push(line);
        self.phase = Phase::Running;
        Ok(self.pending(program, limits))
    }

    fn pending(&self, program: Program, limits: ResourceLimits) -> PendingCall {
        PendingCall {
            generation: self.generation,
            request: ExecutionRequest {
                program,
                stdin: self.stdin_buffer.join("\n"),
                limits,
            },
        }
    }

    /// Apply the outcome of the call issued for `generation`.
    ///
    /// Returns `false` and changes nothing when a newer run has started since.
    pub fn apply(
        &mut self,
        generation: u64,
        outcome: BackendResult<ExecutionResult>,
        revealer: &Revealer,
        error_line: &str,
    ) -> bool {
        if generation != self.generation || self.phase != Phase::Running {
            return false;
        }

        self.phase = match outcome {
            Ok(ExecutionResult::CompileFailure { output }) => {
                let output = output.trim_end_matches(['\r', '\n']);
                self.transcript = if output.is_empty() {
                    Vec::new()
                } else {
                    vec![output.to_string()]
                };
                Phase::Terminal(Termination::CompileError)
            }
            Ok(ExecutionResult::RunOutput { output }) => {
                let decision = revealer.reveal(&output, self.stdin_buffer.len());
                self.transcript = decision.lines;
                if decision.failed {
                    Phase::Terminal(Termination::RuntimeError)
                } else if decision.now_waiting {
                    Phase::WaitingForInput
                } else {
                    Phase::Terminal(Termination::Completed)
                }
            }
            Err(_) => {
                self.transcript.push(error_line.to_string());
                Phase::Terminal(Termination::TransportError)
            }
        };
        true
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        ConsoleSnapshot {
            generation: self.generation,
            transcript: self.transcript.clone(),
            waiting: self.is_waiting(),
            running: self.is_running(),
            failed: self.is_failed(),
            phase: self.phase,
        }
    }
}
