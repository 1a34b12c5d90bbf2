use thiserror::Error;

use super::code::ErrorCode;

/// Whole-batch errors raised before any task runs.
///
/// Per-task failures never surface here; they are recorded on the
/// [`TaskResult`](crate::executor::TaskResult) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Duplicate task namespace: {0}")]
    DuplicateTask(String),

    #[error("Unknown dependency: task '{task}' depends on '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Circular dependency detected: {}", format_cycles(.cycles))]
    CyclicDependency { cycles: Vec<Vec<String>> },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Map scheduler error to a stable error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateTask(_) => ErrorCode::ValidationError,
            Self::UnknownDependency { .. } => ErrorCode::DependencyError,
            Self::CyclicDependency { .. } => ErrorCode::CircularDependency,
            Self::InvalidConfiguration(_) => ErrorCode::ValidationError,
            Self::InvalidTask(_) => ErrorCode::ValidationError,
            Self::Internal(_) => ErrorCode::GeneralError,
        }
    }

    /// Detected cycles, if this is a cycle error.
    pub fn cycles(&self) -> Option<&[Vec<String>]> {
        match self {
            Self::CyclicDependency { cycles } => Some(cycles),
            _ => None,
        }
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut path = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                path.push_str(" -> ");
                path.push_str(first);
            }
            path
        })
        .collect::<Vec<_>>()
        .join("; ")
}
