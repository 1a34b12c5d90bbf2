use serde::Serialize;

use crate::error::ErrorCode;
use crate::executor::types::{BatchResult, TaskResult};

/// Observer for execution lifecycle events (controls output format).
///
/// A panic inside `render` is caught and logged; the event is dropped and
/// the run continues.
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Lifecycle events emitted by the engine, in order:
/// `RunStart`, `Plan`, then per level `StageStart`, `TaskStart`/`TaskComplete`
/// or `TaskSkipped` for each task, `StageEnd`, and finally `RunEnd`.
/// Levels never scheduled because of fail-fast emit only `TaskSkipped`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_tasks: usize,
        total_stages: usize,
    },
    Plan {
        run_id: String,
        stages: Vec<Vec<String>>,
    },
    StageStart {
        run_id: String,
        stage_id: usize,
        task_ids: Vec<String>,
    },
    TaskStart {
        run_id: String,
        task_id: String,
        stage_id: usize,
    },
    TaskComplete {
        run_id: String,
        result: TaskSummary,
    },
    TaskSkipped {
        run_id: String,
        task_id: String,
        stage_id: usize,
        reason: String,
    },
    StageEnd {
        run_id: String,
        stage_id: usize,
        failed: usize,
    },
    RunEnd {
        run_id: String,
        result: RunSummary,
    },
}

/// Output-free view of a task result, so renderers stay independent of the
/// runner's output type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub stage_id: usize,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub error_code: u16,
}

impl<O> From<&TaskResult<O>> for TaskSummary {
    fn from(result: &TaskResult<O>) -> Self {
        Self {
            task_id: result.namespace.clone(),
            stage_id: result.level,
            success: result.success,
            duration_ms: result.duration_ms(),
            error: result.error.as_ref().map(|e| e.to_string()),
            error_code: result
                .error
                .as_ref()
                .map_or(ErrorCode::Success, |e| e.error_code())
                .as_u16(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl<O> From<&BatchResult<O>> for RunSummary {
    fn from(result: &BatchResult<O>) -> Self {
        Self {
            total: result.total,
            successful: result.successful,
            failed: result.failed,
            skipped: result.skipped_count,
            duration_ms: result.total_duration_ms(),
        }
    }
}
