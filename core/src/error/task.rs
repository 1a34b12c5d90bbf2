use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::code::ErrorCode;

/// Why a single task did not succeed. Stored on the task's result, never
/// returned from `execute()`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("task skipped: {0}")]
    Skipped(String),
}

impl TaskError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Failed(_) => ErrorCode::GeneralError,
            Self::Panicked(_) => ErrorCode::Panicked,
            Self::TimedOut(_) => ErrorCode::Timeout,
            Self::Skipped(_) => ErrorCode::Skipped,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}
