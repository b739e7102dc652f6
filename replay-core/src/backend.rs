//! Execution backend seam
//!
//! The backend is a stateless compile-and-run service: it receives the whole
//! program plus the whole stdin blob and answers once the program is done.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// Program snapshot taken when a run starts.
///
/// Re-runs always reuse this snapshot, even if the editor content changed in
/// the meantime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub language: String,
    pub version: String,
    pub source: String,
}

impl Program {
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
            source: source.into(),
        }
    }
}

/// Limits sent explicitly with every backend call
///
/// `-1` memory limits mean "unlimited".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub compile_timeout_ms: u64,
    pub run_timeout_ms: u64,
    pub compile_memory_limit: i64,
    pub run_memory_limit: i64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            compile_timeout_ms: 10_000,
            run_timeout_ms: 3_000,
            compile_memory_limit: -1,
            run_memory_limit: -1,
        }
    }
}

/// One full backend invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub program: Program,
    /// Entire accumulated stdin, newline-joined
    pub stdin: String,
    pub limits: ResourceLimits,
}

/// What the backend reported for a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The compile stage failed; the program never ran
    CompileFailure { output: String },
    /// The program ran (to completion or until killed); combined stdout/stderr
    RunOutput { output: String },
}

impl ExecutionResult {
    pub fn output(&self) -> &str {
        match self {
            ExecutionResult::CompileFailure { output } | ExecutionResult::RunOutput { output } => {
                output
            }
        }
    }

    pub fn is_compile_failure(&self) -> bool {
        matches!(self, ExecutionResult::CompileFailure { .. })
    }
}

/// A stateless execution service.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run `request.program` to completion with `request.stdin` as its input.
    async fn execute(&self, request: &ExecutionRequest) -> BackendResult<ExecutionResult>;
}

#[async_trait]
impl<T: ExecutionBackend + ?Sized> ExecutionBackend for Arc<T> {
    async fn execute(&self, request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
        (**self).execute(request).await
    }
}
