//! Error types for the sensor environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A background task panicked or was cancelled before finishing
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a task failure from a join error (or anything printable).
    pub fn task_failed(err: impl std::fmt::Display) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EnvError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::TaskFailed(format!("panicked: {err}"))
        } else {
            Self::task_failed(err)
        }
    }
}
