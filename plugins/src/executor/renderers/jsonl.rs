use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Local;
use dagrun_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

/// One JSON object per line, suitable for piping into other tools.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self::with_writer(pretty_print, Box::new(io::stdout()))
    }

    pub fn with_writer(pretty_print: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            pretty_print,
            out: Mutex::new(out),
        }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_stages,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_tasks": total_tasks,
                    "total_stages": total_stages,
                }
            }),
            RenderEvent::Plan { run_id, stages } => {
                let total_tasks: usize = stages.iter().map(|s| s.len()).sum();
                json!({
                    "v": 1,
                    "event_type": "executor.plan",
                    "ts": ts,
                    "run_id": run_id,
                    "metadata": {
                        "stages": stages,
                        "total_tasks": total_tasks,
                    }
                })
            }
            RenderEvent::StageStart {
                run_id,
                stage_id,
                task_ids,
            } => json!({
                "v": 1,
                "event_type": "stage.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "stage_id": stage_id,
                    "tasks": task_ids,
                }
            }),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                stage_id,
            } => json!({
                "v": 1,
                "event_type": "task.start",
                "ts": ts,
                "run_id": run_id,
                "task_id": task_id,
                "metadata": {
                    "stage_id": stage_id,
                }
            }),
            RenderEvent::TaskComplete { run_id, result } => json!({
                "v": 1,
                "event_type": "task.end",
                "ts": ts,
                "run_id": run_id,
                "task_id": result.task_id,
                "code": result.error_code,
                "metadata": {
                    "stage_id": result.stage_id,
                    "duration_ms": result.duration_ms,
                    "success": result.success,
                    "error": result.error,
                }
            }),
            RenderEvent::TaskSkipped {
                run_id,
                task_id,
                stage_id,
                reason,
            } => json!({
                "v": 1,
                "event_type": "task.skip",
                "ts": ts,
                "run_id": run_id,
                "task_id": task_id,
                "metadata": {
                    "stage_id": stage_id,
                    "reason": reason,
                }
            }),
            RenderEvent::StageEnd {
                run_id,
                stage_id,
                failed,
            } => json!({
                "v": 1,
                "event_type": "stage.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "stage_id": stage_id,
                    "failed": failed,
                }
            }),
            RenderEvent::RunEnd { run_id, result } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_tasks": result.total,
                    "successful": result.successful,
                    "failed": result.failed,
                    "skipped": result.skipped,
                    "duration_ms": result.duration_ms,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        let line = if self.pretty_print {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .unwrap_or_else(|_| "{}".into());

        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", line);
        }
    }
}
