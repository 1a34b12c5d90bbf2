use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{SchedulerConfig, UnknownDependencyPolicy};
use crate::error::SchedulerError;

use super::aggregate::ResultAggregator;
use super::graph::{check_task, TaskGraph, UnknownResolver};
use super::output::Emitter;
use super::scheduler::execute_stage_parallel;
use super::traits::{OutputRendererPlugin, TaskRunner};
use super::types::{BatchResult, ParallelGroup, Task, TaskResult};

/// Predicate consulted for dependencies outside the batch.
pub type AvailabilityFn = dyn Fn(&str) -> bool + Send + Sync;

/// Execution engine for task dependency graphs
///
/// Holds only the injected runner, configuration and observers. Every call
/// to [`execute`](Self::execute) builds its own graph, worker pool and
/// aggregator, so one engine can serve concurrent batches.
pub struct ExecutionEngine<P, R> {
    runner: Arc<R>,
    config: SchedulerConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    availability: Option<Arc<AvailabilityFn>>,
    _payload: PhantomData<fn(P)>,
}

pub struct ExecutionEngineBuilder<P, R> {
    runner: Arc<R>,
    config: SchedulerConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    availability: Option<Arc<AvailabilityFn>>,
    _payload: PhantomData<fn(P)>,
}

impl<P, R> ExecutionEngine<P, R>
where
    P: Send + Sync + 'static,
    R: TaskRunner<P>,
{
    pub fn new(runner: R, config: SchedulerConfig) -> Self {
        Self {
            runner: Arc::new(runner),
            config,
            renderer: None,
            availability: None,
            _payload: PhantomData,
        }
    }

    pub fn builder(runner: R, config: SchedulerConfig) -> ExecutionEngineBuilder<P, R> {
        ExecutionEngineBuilder::new(runner, config)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every pre-execution stage (validation, graph, cycles, leveling)
    /// without invoking the runner.
    pub fn plan(&self, tasks: Vec<Task<P>>) -> Result<Vec<ParallelGroup<P>>, SchedulerError> {
        self.config.validate()?;
        plan(tasks, self.config.unknown_dependency_policy, |ns| {
            self.is_available(ns)
        })
    }

    /// Execute a batch with dependency graph support.
    ///
    /// Fatal errors (duplicates, unknown dependencies, cycles, bad
    /// configuration) are returned before any task runs. Otherwise the call
    /// always returns a [`BatchResult`]; per-task failures live inside it.
    pub async fn execute(
        &self,
        tasks: Vec<Task<P>>,
    ) -> Result<BatchResult<R::Output>, SchedulerError> {
        let order: Vec<String> = tasks.iter().map(|t| t.namespace.clone()).collect();
        let groups = self.plan(tasks)?;
        self.run_levels(groups, order).await
    }

    /// Execute groups that were leveled by the caller.
    ///
    /// Groups run in the given order. Each dependency must name a task in a
    /// strictly earlier group, or be absent from every group, in which case
    /// the unknown-dependency policy applies. Empty groups are dropped and
    /// levels are renumbered from zero.
    pub async fn execute_groups(
        &self,
        groups: Vec<ParallelGroup<P>>,
    ) -> Result<BatchResult<R::Output>, SchedulerError> {
        self.config.validate()?;
        self.check_groups(&groups)?;

        let groups: Vec<ParallelGroup<P>> = groups
            .into_iter()
            .filter(|g| !g.is_empty())
            .enumerate()
            .map(|(level, g)| ParallelGroup {
                level,
                tasks: g.tasks,
            })
            .collect();
        let order: Vec<String> = groups.iter().flat_map(ParallelGroup::namespaces).collect();

        self.run_levels(groups, order).await
    }

    fn is_available(&self, namespace: &str) -> bool {
        self.availability
            .as_ref()
            .map_or(true, |predicate| predicate(namespace))
    }

    fn check_groups(&self, groups: &[ParallelGroup<P>]) -> Result<(), SchedulerError> {
        let mut group_of: HashMap<&str, usize> = HashMap::new();
        for (index, group) in groups.iter().enumerate() {
            for task in &group.tasks {
                check_task(task)?;
                if group_of.insert(task.namespace.as_str(), index).is_some() {
                    return Err(SchedulerError::DuplicateTask(task.namespace.clone()));
                }
            }
        }

        let mut unknown =
            UnknownResolver::new(self.config.unknown_dependency_policy, |ns: &str| {
                self.is_available(ns)
            });

        for (index, group) in groups.iter().enumerate() {
            for task in &group.tasks {
                for dep in &task.dependencies {
                    match group_of.get(dep.as_str()) {
                        Some(&dep_index) if dep_index < index => {}
                        Some(_) => {
                            return Err(SchedulerError::InvalidTask(format!(
                                "task '{}' depends on '{}', which is not in an earlier group",
                                task.namespace, dep
                            )));
                        }
                        None => unknown.resolve(&task.namespace, dep)?,
                    }
                }
            }
        }

        Ok(())
    }

    /// Execute all levels sequentially (tasks within a level run in parallel)
    async fn run_levels(
        &self,
        groups: Vec<ParallelGroup<P>>,
        order: Vec<String>,
    ) -> Result<BatchResult<R::Output>, SchedulerError> {
        let run_id = Uuid::new_v4().to_string();
        let emitter = Emitter::new(&run_id, self.renderer.clone());
        let levels: Vec<Vec<String>> = groups.iter().map(ParallelGroup::namespaces).collect();

        emitter.run_start(order.len(), groups.len());
        emitter.plan(&levels);

        // One pool per run, shared by every level.
        let pool = Arc::new(Semaphore::new(self.config.max_workers));
        let mut aggregator = ResultAggregator::new(order);
        let mut halted: Option<String> = None;

        for group in &groups {
            let level = group.level;

            if let Some(reason) = &halted {
                for task in &group.tasks {
                    emitter.task_skipped(&task.namespace, level, reason);
                    aggregator.record(TaskResult::skipped(
                        task.namespace.clone(),
                        level,
                        reason.clone(),
                    ))?;
                }
                continue;
            }

            aggregator.mark_level_start();
            emitter.stage_start(level, group.namespaces());

            let mut runnable = Vec::with_capacity(group.len());
            for task in &group.tasks {
                match self.blocking_dependency(task, &aggregator) {
                    Some(dep) => {
                        let reason = format!("dependency '{dep}' did not succeed");
                        emitter.task_skipped(&task.namespace, level, &reason);
                        aggregator.record(TaskResult::skipped(
                            task.namespace.clone(),
                            level,
                            reason,
                        ))?;
                    }
                    None => runnable.push(Arc::clone(task)),
                }
            }

            let results = execute_stage_parallel(
                level,
                &runnable,
                &self.runner,
                &pool,
                self.config.timeout_per_task,
                &emitter,
            )
            .await;

            let failed = results.iter().filter(|r| r.is_failure()).count();
            for result in results {
                aggregator.record(result)?;
            }

            aggregator.mark_level_end();
            emitter.stage_end(level, failed);

            // Stop scheduling further levels (fail-fast)
            if failed > 0 && self.config.fail_fast {
                warn!(
                    run_id = %run_id,
                    level,
                    failed,
                    "fail-fast triggered; remaining levels will be skipped"
                );
                halted = Some(format!(
                    "fail_fast: {failed} task(s) failed in level {level}"
                ));
            }
        }

        let batch = aggregator.finish(run_id, levels)?;
        emitter.run_end(&batch);

        info!(
            run_id = %batch.run_id,
            successful = batch.successful,
            failed = batch.failed,
            skipped = batch.skipped_count,
            "batch complete"
        );

        Ok(batch)
    }

    /// First dependency that failed or was skipped, when dependents of
    /// failures are configured to be skipped.
    fn blocking_dependency<'t>(
        &self,
        task: &'t Task<P>,
        aggregator: &ResultAggregator<R::Output>,
    ) -> Option<&'t str> {
        if !self.config.skip_dependents_on_failure {
            return None;
        }
        task.dependencies
            .iter()
            .find(|dep| aggregator.status(dep) == Some(false))
            .map(String::as_str)
    }
}

impl<P, R> ExecutionEngineBuilder<P, R>
where
    P: Send + Sync + 'static,
    R: TaskRunner<P>,
{
    pub fn new(runner: R, config: SchedulerConfig) -> Self {
        Self {
            runner: Arc::new(runner),
            config,
            renderer: None,
            availability: None,
            _payload: PhantomData,
        }
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Predicate for dependencies outside the batch under
    /// [`UnknownDependencyPolicy::TreatAsSatisfied`].
    pub fn availability<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.availability = Some(Arc::new(predicate));
        self
    }

    pub fn build(self) -> ExecutionEngine<P, R> {
        ExecutionEngine {
            runner: self.runner,
            config: self.config,
            renderer: self.renderer,
            availability: self.availability,
            _payload: PhantomData,
        }
    }
}

/// One-shot convenience: build an engine and execute `tasks`.
pub async fn execute_tasks<P, R>(
    tasks: Vec<Task<P>>,
    runner: R,
    config: SchedulerConfig,
) -> Result<BatchResult<R::Output>, SchedulerError>
where
    P: Send + Sync + 'static,
    R: TaskRunner<P>,
{
    ExecutionEngine::new(runner, config).execute(tasks).await
}

/// Build, validate and level `tasks` without running anything.
pub fn plan<P, F>(
    tasks: Vec<Task<P>>,
    policy: UnknownDependencyPolicy,
    is_available: F,
) -> Result<Vec<ParallelGroup<P>>, SchedulerError>
where
    F: FnMut(&str) -> bool,
{
    let graph = TaskGraph::from_tasks(tasks, policy, is_available)?;
    graph.validate()?;
    graph.topological_sort()
}
