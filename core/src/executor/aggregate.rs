use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::SchedulerError;

use super::types::{BatchResult, TaskResult};

/// Collects terminal results for one run and assembles the batch report.
///
/// Results arrive in completion order; the report lists them in submission
/// order regardless.
pub(crate) struct ResultAggregator<O> {
    order: Vec<String>,
    results: HashMap<String, TaskResult<O>>,
    first_level_start: Option<Instant>,
    last_level_end: Option<Instant>,
}

impl<O> ResultAggregator<O> {
    pub(crate) fn new(order: Vec<String>) -> Self {
        let capacity = order.len();
        Self {
            order,
            results: HashMap::with_capacity(capacity),
            first_level_start: None,
            last_level_end: None,
        }
    }

    pub(crate) fn mark_level_start(&mut self) {
        self.first_level_start.get_or_insert_with(Instant::now);
    }

    pub(crate) fn mark_level_end(&mut self) {
        self.last_level_end = Some(Instant::now());
    }

    /// Store the terminal result for a task. Each task has exactly one.
    pub(crate) fn record(&mut self, result: TaskResult<O>) -> Result<(), SchedulerError> {
        if self.results.contains_key(&result.namespace) {
            return Err(SchedulerError::Internal(format!(
                "task '{}' reported more than one terminal result",
                result.namespace
            )));
        }
        self.results.insert(result.namespace.clone(), result);
        Ok(())
    }

    /// `Some(true)` once `namespace` succeeded, `Some(false)` once it failed
    /// or was skipped, `None` while it has no result yet.
    pub(crate) fn status(&self, namespace: &str) -> Option<bool> {
        self.results.get(namespace).map(|r| r.success)
    }

    pub(crate) fn finish(
        mut self,
        run_id: String,
        levels: Vec<Vec<String>>,
    ) -> Result<BatchResult<O>, SchedulerError> {
        let mut results = Vec::with_capacity(self.order.len());
        for namespace in &self.order {
            let result = self.results.remove(namespace).ok_or_else(|| {
                SchedulerError::Internal(format!("task '{namespace}' finished without a result"))
            })?;
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.success).count();
        let skipped_count = results.iter().filter(|r| r.skipped).count();
        let failed = results.iter().filter(|r| r.is_failure()).count();

        let total_duration = match (self.first_level_start, self.last_level_end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        };

        Ok(BatchResult {
            run_id,
            total: results.len(),
            results,
            successful,
            failed,
            skipped_count,
            total_duration,
            levels,
        })
    }
}
