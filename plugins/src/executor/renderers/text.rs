use std::io::{self, Write};
use std::sync::Mutex;

use dagrun_core::executor::traits::{OutputRendererPlugin, RenderEvent};

/// Human-readable, one line per event.
pub struct TextRendererPlugin {
    ascii_only: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self::with_writer(ascii_only, Box::new(io::stdout()))
    }

    pub fn with_writer(ascii_only: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            ascii_only,
            out: Mutex::new(out),
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_stages,
            } => format!(
                "RUN START {} (tasks: {}, stages: {})",
                run_id, total_tasks, total_stages
            ),
            RenderEvent::Plan { run_id, stages } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, stage) in stages.iter().enumerate() {
                    out.push_str(&format!("\n  stage {}: {}", idx, stage.join(", ")));
                }
                out
            }
            RenderEvent::StageStart {
                run_id,
                stage_id,
                task_ids,
            } => format!(
                "STAGE START {} (stage {}, tasks: {})",
                run_id,
                stage_id,
                task_ids.len()
            ),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                stage_id,
            } => format!(
                "TASK START {} (stage {}, task {})",
                run_id, stage_id, task_id
            ),
            RenderEvent::TaskComplete { run_id, result } => {
                let status = match (result.success, self.ascii_only) {
                    (true, true) => "OK",
                    (true, false) => "SUCCESS",
                    (false, true) => "FAIL",
                    (false, false) => "FAILED",
                };
                let mut line = format!(
                    "TASK END {} (task {}, status {}, duration {}ms)",
                    run_id, result.task_id, status, result.duration_ms
                );
                if let Some(err) = &result.error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            RenderEvent::TaskSkipped {
                run_id,
                task_id,
                stage_id,
                reason,
            } => format!(
                "TASK SKIP {} (stage {}, task {}): {}",
                run_id, stage_id, task_id, reason
            ),
            RenderEvent::StageEnd {
                run_id,
                stage_id,
                failed,
            } => format!("STAGE END {} (stage {}, failed {})", run_id, stage_id, failed),
            RenderEvent::RunEnd { run_id, result } => format!(
                "RUN END {} (successful {}, failed {}, skipped {}, duration {}ms)",
                run_id, result.successful, result.failed, result.skipped, result.duration_ms
            ),
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        let line = self.format_event(event);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", line);
        }
    }
}
