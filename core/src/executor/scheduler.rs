use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::error::TaskError;

use super::output::Emitter;
use super::traits::TaskRunner;
use super::types::{Task, TaskResult};

/// Execute a single level of tasks in parallel
///
/// # Arguments
///
/// * `level` - Index of the level being executed
/// * `tasks` - Tasks to dispatch in this level
/// * `runner` - Collaborator that performs each task
/// * `pool` - Worker slots shared by all levels of one run
/// * `default_timeout` - Deadline for tasks without their own override
///
/// # Returns
///
/// One terminal result per task, in completion order. Returns only after
/// every task has succeeded, failed or timed out, which is the barrier
/// between levels.
pub(crate) async fn execute_stage_parallel<P, R>(
    level: usize,
    tasks: &[Arc<Task<P>>],
    runner: &Arc<R>,
    pool: &Arc<Semaphore>,
    default_timeout: Duration,
    emitter: &Emitter,
) -> Vec<TaskResult<R::Output>>
where
    P: Send + Sync + 'static,
    R: TaskRunner<P>,
{
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for task in tasks {
        let task = Arc::clone(task);
        let runner = Arc::clone(runner);
        let pool = Arc::clone(pool);
        let emitter = emitter.clone();

        futs.push(async move {
            // Excess tasks queue here until a slot frees.
            let permit = match pool.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return TaskResult::failed(
                        task.namespace.clone(),
                        level,
                        TaskError::Failed("worker pool closed unexpectedly".to_string()),
                        Utc::now(),
                        Duration::ZERO,
                    );
                }
            };

            emitter.task_start(&task.namespace, level);
            let result = run_with_deadline(task, runner, permit, level, default_timeout).await;
            emitter.task_complete(&result);
            result
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(result) = futs.next().await {
        results.push(result);
    }

    results
}

/// Run one task on its own tokio task and wait for it with a deadline.
///
/// The worker slot travels with the spawned runner. On timeout the join
/// handle is dropped, which detaches the task: the result is recorded as
/// timed out right away, the runner keeps going in the background and
/// whatever it eventually returns is discarded. The slot frees only when
/// the runner itself returns.
async fn run_with_deadline<P, R>(
    task: Arc<Task<P>>,
    runner: Arc<R>,
    permit: OwnedSemaphorePermit,
    level: usize,
    default_timeout: Duration,
) -> TaskResult<R::Output>
where
    P: Send + Sync + 'static,
    R: TaskRunner<P>,
{
    let namespace = task.namespace.clone();
    let deadline = task.effective_timeout(default_timeout);
    let start_time = Utc::now();
    let started = Instant::now();

    let handle = tokio::spawn(async move {
        let _permit = permit;
        runner.run(task).await
    });

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(Ok(output))) => {
            TaskResult::succeeded(namespace, level, output, start_time, started.elapsed())
        }
        Ok(Ok(Err(err))) => {
            debug!(task = %namespace, error = %err, "runner returned an error");
            TaskResult::failed(
                namespace,
                level,
                TaskError::Failed(format!("{err:#}")),
                start_time,
                started.elapsed(),
            )
        }
        Ok(Err(join_err)) => {
            let error = if join_err.is_panic() {
                TaskError::Panicked(panic_message(join_err.into_panic()))
            } else {
                TaskError::Failed(format!("runner task was cancelled: {join_err}"))
            };
            TaskResult::failed(namespace, level, error, start_time, started.elapsed())
        }
        Err(_elapsed) => {
            warn!(
                task = %namespace,
                timeout_ms = deadline.as_millis() as u64,
                "task exceeded its deadline; abandoning runner"
            );
            TaskResult::failed(
                namespace,
                level,
                TaskError::TimedOut(deadline),
                start_time,
                started.elapsed(),
            )
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
