use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::traits::{OutputRendererPlugin, RenderEvent, RunSummary, TaskSummary};
use super::types::{BatchResult, TaskResult};

/// Routes lifecycle events to the installed renderer, or to `tracing` when
/// none is installed. One emitter per run; cheap to clone into task futures.
#[derive(Clone)]
pub(crate) struct Emitter {
    run_id: Arc<str>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

impl Emitter {
    pub(crate) fn new(run_id: &str, renderer: Option<Arc<dyn OutputRendererPlugin>>) -> Self {
        Self {
            run_id: Arc::from(run_id),
            renderer,
        }
    }

    /// A renderer that panics loses the event; the run carries on.
    fn emit(&self, event: RenderEvent) {
        match &self.renderer {
            Some(renderer) => {
                let rendered = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&event)));
                if rendered.is_err() {
                    warn!(
                        run_id = %self.run_id,
                        renderer = renderer.name(),
                        "renderer panicked; event dropped"
                    );
                }
            }
            None => log_event(&event),
        }
    }

    pub(crate) fn run_start(&self, total_tasks: usize, total_stages: usize) {
        self.emit(RenderEvent::RunStart {
            run_id: self.run_id.to_string(),
            total_tasks,
            total_stages,
        });
    }

    pub(crate) fn plan(&self, stages: &[Vec<String>]) {
        self.emit(RenderEvent::Plan {
            run_id: self.run_id.to_string(),
            stages: stages.to_vec(),
        });
    }

    pub(crate) fn stage_start(&self, stage_id: usize, task_ids: Vec<String>) {
        self.emit(RenderEvent::StageStart {
            run_id: self.run_id.to_string(),
            stage_id,
            task_ids,
        });
    }

    pub(crate) fn task_start(&self, task_id: &str, stage_id: usize) {
        self.emit(RenderEvent::TaskStart {
            run_id: self.run_id.to_string(),
            task_id: task_id.to_string(),
            stage_id,
        });
    }

    pub(crate) fn task_complete<O>(&self, result: &TaskResult<O>) {
        self.emit(RenderEvent::TaskComplete {
            run_id: self.run_id.to_string(),
            result: TaskSummary::from(result),
        });
    }

    pub(crate) fn task_skipped(&self, task_id: &str, stage_id: usize, reason: &str) {
        self.emit(RenderEvent::TaskSkipped {
            run_id: self.run_id.to_string(),
            task_id: task_id.to_string(),
            stage_id,
            reason: reason.to_string(),
        });
    }

    pub(crate) fn stage_end(&self, stage_id: usize, failed: usize) {
        self.emit(RenderEvent::StageEnd {
            run_id: self.run_id.to_string(),
            stage_id,
            failed,
        });
    }

    pub(crate) fn run_end<O>(&self, result: &BatchResult<O>) {
        self.emit(RenderEvent::RunEnd {
            run_id: self.run_id.to_string(),
            result: RunSummary::from(result),
        });
    }
}

fn log_event(event: &RenderEvent) {
    match event {
        RenderEvent::RunStart {
            run_id,
            total_tasks,
            total_stages,
        } => info!(run_id = %run_id, total_tasks, total_stages, "run started"),
        RenderEvent::Plan { run_id, stages } => {
            for (level, tasks) in stages.iter().enumerate() {
                debug!(run_id = %run_id, level, tasks = %tasks.join(", "), "planned level");
            }
        }
        RenderEvent::StageStart {
            run_id,
            stage_id,
            task_ids,
        } => debug!(run_id = %run_id, level = stage_id, tasks = task_ids.len(), "level started"),
        RenderEvent::TaskStart {
            run_id,
            task_id,
            stage_id,
        } => debug!(run_id = %run_id, task = %task_id, level = stage_id, "task started"),
        RenderEvent::TaskComplete { run_id, result } => {
            if result.success {
                debug!(
                    run_id = %run_id,
                    task = %result.task_id,
                    duration_ms = result.duration_ms,
                    "task succeeded"
                );
            } else {
                warn!(
                    run_id = %run_id,
                    task = %result.task_id,
                    duration_ms = result.duration_ms,
                    error = result.error.as_deref().unwrap_or(""),
                    "task failed"
                );
            }
        }
        RenderEvent::TaskSkipped {
            run_id,
            task_id,
            reason,
            ..
        } => warn!(run_id = %run_id, task = %task_id, reason = %reason, "task skipped"),
        RenderEvent::StageEnd {
            run_id,
            stage_id,
            failed,
        } => debug!(run_id = %run_id, level = stage_id, failed, "level finished"),
        RenderEvent::RunEnd { run_id, result } => info!(
            run_id = %run_id,
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            skipped = result.skipped,
            duration_ms = result.duration_ms,
            "run finished"
        ),
    }
}
