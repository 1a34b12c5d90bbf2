#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagrun_core::api::{FnRunner, SchedulerConfig, Task, TaskRunner, UnknownDependencyPolicy};

/// What the scripted runner does with a task.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail,
    Panic,
    Sleep(Duration),
}

/// Observations shared between a test and its runner.
#[derive(Default)]
pub struct Probe {
    active: AtomicUsize,
    peak: AtomicUsize,
    invoked: Mutex<Vec<String>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Namespaces in invocation order.
    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.invoked.lock().unwrap().len()
    }

    /// Highest number of runner invocations observed in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Runner invocations in flight right now.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Leaves the in-flight count when dropped, including on unwind.
struct InFlight(Arc<Probe>);

impl InFlight {
    fn enter(probe: Arc<Probe>) -> Self {
        let now = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        probe.peak.fetch_max(now, Ordering::SeqCst);
        Self(probe)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runner that follows each task's [`Step`] and returns the namespace.
pub fn scripted(probe: Arc<Probe>) -> impl TaskRunner<Step, Output = String> {
    FnRunner::new(move |task: Arc<Task<Step>>| {
        let probe = Arc::clone(&probe);
        async move {
            probe.invoked.lock().unwrap().push(task.namespace.clone());
            let _in_flight = InFlight::enter(probe);

            match &task.payload {
                Step::Succeed => Ok(task.namespace.clone()),
                Step::Fail => Err(anyhow::anyhow!("{} failed on purpose", task.namespace)),
                Step::Panic => panic!("{} panicked", task.namespace),
                Step::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(task.namespace.clone())
                }
            }
        }
    })
}

pub fn config(max_workers: usize, timeout: Duration) -> SchedulerConfig {
    SchedulerConfig::new(max_workers, timeout, false, UnknownDependencyPolicy::Fail)
}

pub fn ok(ns: &str) -> Task<Step> {
    Task::new(ns, Step::Succeed)
}

pub fn failing(ns: &str) -> Task<Step> {
    Task::new(ns, Step::Fail)
}

pub fn sleeping(ns: &str, millis: u64) -> Task<Step> {
    Task::new(ns, Step::Sleep(Duration::from_millis(millis)))
}
