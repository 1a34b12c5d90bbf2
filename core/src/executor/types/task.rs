use std::sync::Arc;
use std::time::Duration;

/// A named unit of work submitted as part of one batch.
///
/// `payload` is opaque to the scheduler; only the runner interprets it.
#[derive(Debug, Clone)]
pub struct Task<P> {
    pub namespace: String,
    pub payload: P,
    pub dependencies: Vec<String>,
    pub timeout_override: Option<Duration>,
}

impl<P> Task<P> {
    pub fn new(namespace: impl Into<String>, payload: P) -> Self {
        Self {
            namespace: namespace.into(),
            payload,
            dependencies: Vec::new(),
            timeout_override: None,
        }
    }

    /// Add dependencies. Repeated names are kept once, in first-seen order.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    /// Deadline for this task given the batch default.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout_override.unwrap_or(default)
    }
}

/// Graph node: the task plus its computed in-degree and dependents.
#[derive(Debug)]
pub struct TaskNode<P> {
    pub task: Arc<Task<P>>,
    /// Dependencies that resolve to tasks inside the batch.
    pub in_degree: usize,
    /// Tasks that depend on this one, in submission order.
    pub dependents: Vec<String>,
}

// Manual impl: `P` itself need not be `Clone` behind the `Arc`.
impl<P> Clone for TaskNode<P> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
            in_degree: self.in_degree,
            dependents: self.dependents.clone(),
        }
    }
}

/// Tasks with no dependency relationship among them, eligible to run
/// concurrently once every earlier level has terminated.
#[derive(Debug)]
pub struct ParallelGroup<P> {
    pub level: usize,
    pub tasks: Vec<Arc<Task<P>>>,
}

impl<P> Clone for ParallelGroup<P> {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            tasks: self.tasks.clone(),
        }
    }
}

impl<P> ParallelGroup<P> {
    pub fn namespaces(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.namespace.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
