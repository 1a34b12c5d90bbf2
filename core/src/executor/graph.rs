use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::UnknownDependencyPolicy;
use crate::error::SchedulerError;
use crate::executor::types::{Task, TaskNode};

/// Task dependency graph (DAG) for one batch.
#[derive(Debug)]
pub struct TaskGraph<P> {
    /// Task nodes: namespace -> node
    pub(crate) nodes: HashMap<String, TaskNode<P>>,

    /// Dependency edges inside the batch: namespace -> dependencies
    pub(crate) edges: HashMap<String, Vec<String>>,

    /// Unknown dependencies accepted under `TreatAsSatisfied`
    pub(crate) external_dependencies: Vec<String>,

    /// Original submission order (for stable sorting)
    pub(crate) insertion_order: Vec<String>,

    pub(crate) positions: HashMap<String, usize>,
}

impl<P> TaskGraph<P> {
    /// Construct the graph, rejecting duplicate namespaces and resolving
    /// unknown dependencies per `policy`.
    ///
    /// `is_available` is consulted once per distinct unknown dependency, and
    /// only under [`UnknownDependencyPolicy::TreatAsSatisfied`].
    pub fn from_tasks<F>(
        tasks: Vec<Task<P>>,
        policy: UnknownDependencyPolicy,
        mut is_available: F,
    ) -> Result<Self, SchedulerError>
    where
        F: FnMut(&str) -> bool,
    {
        let mut nodes: HashMap<String, TaskNode<P>> = HashMap::with_capacity(tasks.len());
        let mut positions = HashMap::with_capacity(tasks.len());
        let mut insertion_order = Vec::with_capacity(tasks.len());

        // Add all nodes
        for task in tasks {
            check_task(&task)?;
            if nodes.contains_key(&task.namespace) {
                return Err(SchedulerError::DuplicateTask(task.namespace));
            }

            let namespace = task.namespace.clone();
            positions.insert(namespace.clone(), insertion_order.len());
            insertion_order.push(namespace.clone());
            nodes.insert(
                namespace,
                TaskNode {
                    task: Arc::new(task),
                    in_degree: 0,
                    dependents: Vec::new(),
                },
            );
        }

        // Resolve dependencies and build reverse edges
        let mut edges: HashMap<String, Vec<String>> = HashMap::with_capacity(nodes.len());
        let mut unknown = UnknownResolver::new(policy, &mut is_available);

        for task_id in &insertion_order {
            let task = Arc::clone(&nodes[task_id].task);
            let mut resolved = Vec::with_capacity(task.dependencies.len());

            for dep in &task.dependencies {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(task_id.clone());
                    resolved.push(dep.clone());
                } else {
                    unknown.resolve(task_id, dep)?;
                }
            }

            if let Some(node) = nodes.get_mut(task_id) {
                node.in_degree = resolved.len();
            }
            edges.insert(task_id.clone(), resolved);
        }

        let external_dependencies = unknown.into_accepted();

        debug!(
            tasks = insertion_order.len(),
            external = external_dependencies.len(),
            "task graph built"
        );

        Ok(Self {
            nodes,
            edges,
            external_dependencies,
            insertion_order,
            positions,
        })
    }

    /// Reject graphs that contain a cycle, reporting every cycle found.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        let cycles = self.detect_cycles();
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::CyclicDependency { cycles })
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Namespaces in submission order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.insertion_order.iter().map(String::as_str)
    }

    pub fn node(&self, namespace: &str) -> Option<&TaskNode<P>> {
        self.nodes.get(namespace)
    }

    /// In-batch dependencies of `namespace`.
    pub fn dependencies_of(&self, namespace: &str) -> &[String] {
        self.edges.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks that depend directly on `namespace`.
    pub fn dependents_of(&self, namespace: &str) -> &[String] {
        self.nodes
            .get(namespace)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn external_dependencies(&self) -> &[String] {
        &self.external_dependencies
    }

    pub(crate) fn position(&self, namespace: &str) -> usize {
        self.positions.get(namespace).copied().unwrap_or(usize::MAX)
    }
}

/// Per-task checks that do not depend on the rest of the batch.
pub(crate) fn check_task<P>(task: &Task<P>) -> Result<(), SchedulerError> {
    if task.namespace.trim().is_empty() {
        return Err(SchedulerError::InvalidTask(
            "task namespace must not be empty".to_string(),
        ));
    }
    if task.timeout_override.is_some_and(|t| t.is_zero()) {
        return Err(SchedulerError::InvalidConfiguration(format!(
            "timeout_override for task '{}' must be greater than zero",
            task.namespace
        )));
    }
    Ok(())
}

/// Applies the unknown-dependency policy to namespaces absent from a batch.
///
/// The availability predicate is asked at most once per distinct namespace.
pub(crate) struct UnknownResolver<F> {
    policy: UnknownDependencyPolicy,
    is_available: F,
    answers: HashMap<String, bool>,
    accepted: Vec<String>,
}

impl<F> UnknownResolver<F>
where
    F: FnMut(&str) -> bool,
{
    pub(crate) fn new(policy: UnknownDependencyPolicy, is_available: F) -> Self {
        Self {
            policy,
            is_available,
            answers: HashMap::new(),
            accepted: Vec::new(),
        }
    }

    pub(crate) fn resolve(&mut self, task: &str, dependency: &str) -> Result<(), SchedulerError> {
        let rejected = || SchedulerError::UnknownDependency {
            task: task.to_string(),
            dependency: dependency.to_string(),
        };

        if self.policy == UnknownDependencyPolicy::Fail {
            return Err(rejected());
        }

        let available = match self.answers.get(dependency) {
            Some(&known) => known,
            None => {
                let answer = (self.is_available)(dependency);
                self.answers.insert(dependency.to_string(), answer);
                if answer {
                    self.accepted.push(dependency.to_string());
                }
                answer
            }
        };

        if !available {
            return Err(rejected());
        }

        warn!(
            task = %task,
            dependency = %dependency,
            "dependency outside the batch treated as satisfied"
        );
        Ok(())
    }

    pub(crate) fn into_accepted(self) -> Vec<String> {
        self.accepted
    }
}
