/// This module defines the error types for checklog.
///
/// # Fatal vs Recoverable
///
/// Only configuration problems escape a run as an `Err`:
/// ```rust,ignore
/// match check_logs(&config) {
///     Ok(report) => // hand report.total_matches to the threshold layer,
///     Err(CheckError::InvalidPattern { .. }) => // nothing was scanned,
///     Err(e) => // other fatal setup error
/// }
/// ```
///
/// Per-file I/O failures and state persistence failures are recoverable. They are
/// logged through `tracing` and surface in the report as a per-file status, never
/// as an error returned from the pipeline.
use std::path::PathBuf;
use thiserror::Error;

/// Result type for checklog operations
pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that can occur while checking log files
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("State error: {0}")]
    StateError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Pipeline error: {0}")]
    PipelineError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CheckError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_threshold(msg: impl Into<String>) -> Self {
        Self::InvalidThreshold(msg.into())
    }

    pub fn state_error(msg: impl Into<String>) -> Self {
        Self::StateError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn pipeline_error(msg: impl Into<String>) -> Self {
        Self::PipelineError(msg.into())
    }

    /// Maps an I/O error on `path` to the most specific variant
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}

impl From<config::ConfigError> for CheckError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
