use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TaskError;

/// Outcome of a single task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult<O> {
    pub namespace: String,

    /// Level the task belonged to.
    pub level: usize,

    pub success: bool,

    /// Runner output; present only on success.
    pub output: Option<O>,

    pub error: Option<TaskError>,

    /// Time from dispatch to terminal state (zero for skipped tasks).
    pub duration: Duration,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    /// Never dispatched because of fail-fast or a failed dependency.
    pub skipped: bool,
}

impl<O> TaskResult<O> {
    pub fn succeeded(
        namespace: String,
        level: usize,
        output: O,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            namespace,
            level,
            success: true,
            output: Some(output),
            error: None,
            duration,
            start_time,
            end_time: Utc::now(),
            skipped: false,
        }
    }

    pub fn failed(
        namespace: String,
        level: usize,
        error: TaskError,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            namespace,
            level,
            success: false,
            output: None,
            error: Some(error),
            duration,
            start_time,
            end_time: Utc::now(),
            skipped: false,
        }
    }

    pub fn skipped(namespace: String, level: usize, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            namespace,
            level,
            success: false,
            output: None,
            error: Some(TaskError::Skipped(reason.into())),
            duration: Duration::ZERO,
            start_time: now,
            end_time: now,
            skipped: true,
        }
    }

    /// Failed after being dispatched (not skipped).
    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Report for a whole batch. `results` follows submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult<O> {
    pub run_id: String,
    pub results: Vec<TaskResult<O>>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped_count: usize,
    /// Wall-clock time from the first level's start to the last level's end.
    pub total_duration: Duration,
    /// Namespaces per level, as planned.
    pub levels: Vec<Vec<String>>,
}

impl<O> BatchResult<O> {
    pub fn is_success(&self) -> bool {
        self.successful == self.total
    }

    pub fn get(&self, namespace: &str) -> Option<&TaskResult<O>> {
        self.results.iter().find(|r| r.namespace == namespace)
    }

    /// Dispatched tasks that failed, in submission order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskResult<O>> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration.as_millis() as u64
    }
}
