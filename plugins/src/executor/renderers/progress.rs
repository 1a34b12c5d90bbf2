use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use dagrun_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Visual progress monitor for task execution
///
/// Provides real-time progress bars for overall execution and individual tasks
pub struct ProgressMonitor {
    /// Multi-progress container
    multi: MultiProgress,
    /// Overall progress bar
    overall: ProgressBar,
    /// Per-task progress spinners
    task_bars: HashMap<String, ProgressBar>,
    ascii_only: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_tasks` - Total number of tasks to execute
    /// * `visible` - Draw to stderr; when false every bar is hidden
    /// * `ascii_only` - Avoid box-drawing and emoji glyphs
    pub fn new(total_tasks: usize, visible: bool, ascii_only: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);
        let overall = multi.add(ProgressBar::new(total_tasks as u64));

        let chars = if ascii_only { "#>-" } else { "█▓▒░  " };
        overall.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(chars),
        );
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            ascii_only,
        }
    }

    /// Add a task and create its progress spinner
    pub fn add_task(&mut self, task_id: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        let ticks: &[&str] = if self.ascii_only {
            &["|", "/", "-", "\\"]
        } else {
            &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]
        };
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(ticks),
        );
        let icon = if self.ascii_only { "..." } else { "⏳" };
        bar.set_message(format!("{} {}", icon, task_id));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    /// Mark a task as terminal (succeeded, failed or skipped)
    pub fn complete_task(&mut self, task_id: &str, success: bool, detail: &str) {
        let bar = self.task_bars.remove(task_id).unwrap_or_else(|| {
            // Skipped tasks never started, so they have no spinner yet.
            self.multi.add(ProgressBar::new_spinner())
        });

        let icon = match (success, self.ascii_only) {
            (true, true) => "[ok]",
            (true, false) => "✅",
            (false, true) => "[x]",
            (false, false) => "❌",
        };
        bar.finish_with_message(format!("{} {} ({})", icon, task_id, detail));

        self.overall.inc(1);
    }

    /// Mark stage progress
    pub fn update_stage(&self, stage_id: usize, total_stages: usize) {
        self.overall
            .set_message(format!("Stage {}/{}", stage_id + 1, total_stages));
    }

    /// Finish overall progress
    pub fn finish(&self, success: bool) {
        let msg = match (success, self.ascii_only) {
            (true, true) => "All tasks completed",
            (true, false) => "✅ All tasks completed",
            (false, true) => "Execution finished with failures",
            (false, false) => "❌ Execution finished with failures",
        };

        self.overall.finish_with_message(msg.to_string());
    }

    pub fn position(&self) -> u64 {
        self.overall.position()
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        // Ensure all spinners are cleaned up
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

/// Renders execution events as indicatif progress bars on stderr.
///
/// The monitor is created on `RunStart`, when the task count is known, and
/// dropped on `RunEnd`.
pub struct ProgressRendererPlugin {
    visible: bool,
    ascii_only: bool,
    state: Mutex<Option<RunProgress>>,
}

struct RunProgress {
    monitor: ProgressMonitor,
    total_stages: usize,
}

impl ProgressRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self {
            visible: true,
            ascii_only,
            state: Mutex::new(None),
        }
    }

    /// Tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            visible: false,
            ascii_only: true,
            state: Mutex::new(None),
        }
    }

    /// Tasks that reached a terminal state in the current run.
    pub fn completed(&self) -> Option<u64> {
        let state = self.state.lock().ok()?;
        state.as_ref().map(|run| run.monitor.position())
    }
}

impl OutputRendererPlugin for ProgressRendererPlugin {
    fn name(&self) -> &str {
        "progress-renderer"
    }

    fn format(&self) -> &str {
        "progress"
    }

    fn render(&self, event: &RenderEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        match event {
            RenderEvent::RunStart {
                total_tasks,
                total_stages,
                ..
            } => {
                *state = Some(RunProgress {
                    monitor: ProgressMonitor::new(*total_tasks, self.visible, self.ascii_only),
                    total_stages: *total_stages,
                });
            }
            RenderEvent::StageStart { stage_id, .. } => {
                if let Some(run) = state.as_ref() {
                    run.monitor.update_stage(*stage_id, run.total_stages);
                }
            }
            RenderEvent::TaskStart { task_id, .. } => {
                if let Some(run) = state.as_mut() {
                    run.monitor.add_task(task_id);
                }
            }
            RenderEvent::TaskComplete { result, .. } => {
                if let Some(run) = state.as_mut() {
                    let detail = match &result.error {
                        Some(err) => format!("{}ms, {}", result.duration_ms, err),
                        None => format!("{}ms", result.duration_ms),
                    };
                    run.monitor
                        .complete_task(&result.task_id, result.success, &detail);
                }
            }
            RenderEvent::TaskSkipped {
                task_id, reason, ..
            } => {
                if let Some(run) = state.as_mut() {
                    run.monitor
                        .complete_task(task_id, false, &format!("skipped: {}", reason));
                }
            }
            RenderEvent::RunEnd { result, .. } => {
                if let Some(run) = state.as_ref() {
                    run.monitor.finish(result.failed == 0 && result.skipped == 0);
                }
            }
            RenderEvent::Plan { .. } | RenderEvent::StageEnd { .. } => {}
        }
    }
}
