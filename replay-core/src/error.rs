//! Error types for the replay console

use thiserror::Error;

/// Failures of a single backend call.
///
/// Every variant is terminal for the session that issued the call. The
/// console never retries; the user has to start a new run.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent or the response could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not a valid execution report
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// The response carried neither a compile failure nor run output
    #[error("backend response has neither a compile failure nor run output")]
    Ambiguous,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised while loading a [`ConsoleConfig`](crate::ConsoleConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
