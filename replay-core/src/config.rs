//! Console configuration
//!
//! Sources, later ones overriding earlier ones: built-in defaults, an optional
//! TOML file, then `REPLAY_*` environment variables. Binaries apply their own
//! command-line flags on top.
//!
//! ```toml
//! endpoint = "http://localhost:2000/api/v2/execute"
//! error_line = "Error executing code"
//!
//! [limits]
//! run_timeout_ms = 5000
//!
//! [markers]
//! prompt = ["Enter", "Input"]
//! error = ["error:", "Traceback"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::ResourceLimits;
use crate::error::{ConfigError, ConfigResult};
use crate::revealer::MarkerSet;

/// Public Piston instance
pub const DEFAULT_ENDPOINT: &str = "https://emkc.org/api/v2/piston/execute";

/// Line appended to the transcript when a backend call fails
pub const DEFAULT_ERROR_LINE: &str = "Error executing code";

pub const ENV_ENDPOINT: &str = "REPLAY_PISTON_URL";
pub const ENV_RUN_TIMEOUT: &str = "REPLAY_RUN_TIMEOUT_MS";
pub const ENV_COMPILE_TIMEOUT: &str = "REPLAY_COMPILE_TIMEOUT_MS";
pub const ENV_PROMPT_MARKERS: &str = "REPLAY_PROMPT_MARKERS";
pub const ENV_ERROR_MARKERS: &str = "REPLAY_ERROR_MARKERS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Execute endpoint of the backend
    pub endpoint: String,

    /// Limits sent with every call
    pub limits: ResourceLimits,

    /// Prompt and error markers for the revealer
    pub markers: MarkerSet,

    /// Synthetic transcript line for transport failures
    pub error_line: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limits: ResourceLimits::default(),
            markers: MarkerSet::default(),
            error_line: DEFAULT_ERROR_LINE.to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_env()
    }

    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Apply `REPLAY_*` overrides read through `lookup`.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|s| !s.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        if let Some(value) = lookup(ENV_RUN_TIMEOUT) {
            self.limits.run_timeout_ms = parse_millis(ENV_RUN_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_COMPILE_TIMEOUT) {
            self.limits.compile_timeout_ms = parse_millis(ENV_COMPILE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_PROMPT_MARKERS) {
            self.markers.prompt = split_markers(&value);
        }
        if let Some(value) = lookup(ENV_ERROR_MARKERS) {
            self.markers.error = split_markers(&value);
        }
        Ok(self)
    }
}

fn parse_millis(key: &'static str, value: &str) -> ConfigResult<u64> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Comma-separated list; surrounding whitespace is kept off, empties dropped.
fn split_markers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
