//! Piston execute API adapter
//!
//! `POST {endpoint}` with the whole program and stdin; the answer holds a
//! `compile` stage (compiled languages only) and a `run` stage. A failed
//! compile stage comes back without `run`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::{ExecutionBackend, ExecutionRequest, ExecutionResult};
use crate::config::ConsoleConfig;
use crate::error::{BackendError, BackendResult};

/// Request body of the execute endpoint
#[derive(Debug, Serialize)]
pub struct PistonRequest<'a> {
    pub language: &'a str,
    pub version: &'a str,
    pub files: Vec<PistonFile<'a>>,
    pub stdin: &'a str,
    pub compile_timeout: u64,
    pub run_timeout: u64,
    pub compile_memory_limit: i64,
    pub run_memory_limit: i64,
}

#[derive(Debug, Serialize)]
pub struct PistonFile<'a> {
    pub content: &'a str,
}

impl<'a> From<&'a ExecutionRequest> for PistonRequest<'a> {
    fn from(request: &'a ExecutionRequest) -> Self {
        Self {
            language: &request.program.language,
            version: &request.program.version,
            files: vec![PistonFile {
                content: &request.program.source,
            }],
            stdin: &request.stdin,
            compile_timeout: request.limits.compile_timeout_ms,
            run_timeout: request.limits.run_timeout_ms,
            compile_memory_limit: request.limits.compile_memory_limit,
            run_memory_limit: request.limits.run_memory_limit,
        }
    }
}

/// Response body of the execute endpoint. Error bodies only carry `message`.
#[derive(Debug, Default, Deserialize)]
pub struct PistonResponse {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub compile: Option<StageReport>,
    #[serde(default)]
    pub run: Option<StageReport>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StageReport {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Combined stdout and stderr in emission order
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
}

impl StageReport {
    pub fn failed(&self) -> bool {
        self.code.is_some_and(|code| code != 0) || self.signal.is_some()
    }
}

impl PistonResponse {
    pub fn into_result(self) -> BackendResult<ExecutionResult> {
        match (self.compile, self.run) {
            (Some(compile), None) => Ok(ExecutionResult::CompileFailure {
                output: compile.output,
            }),
            (Some(compile), Some(_)) if compile.failed() => Ok(ExecutionResult::CompileFailure {
                output: compile.output,
            }),
            (_, Some(run)) => Ok(ExecutionResult::RunOutput { output: run.output }),
            (None, None) => Err(match self.message {
                Some(message) => BackendError::Malformed(message),
                None => BackendError::Ambiguous,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PistonClient {
    http: Client,
    endpoint: String,
}

impl PistonClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Reuse an existing client (proxies, TLS settings, ...).
    ///
    /// No request timeout is set here; the backend's run timeout bounds
    /// every call.
    pub fn with_client(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExecutionBackend for PistonClient {
    async fn execute(&self, request: &ExecutionRequest) -> BackendResult<ExecutionResult> {
        let body = PistonRequest::from(request);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<PistonResponse>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(text);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PistonResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))?;
        parsed.into_result()
    }
}
