//! Dependency-aware parallel executor
//!
//! Takes a batch of named tasks, each possibly depending on others, and runs
//! them with as much concurrency as the dependencies allow:
//! - Task dependency graph construction and validation
//! - Circular dependency detection
//! - Topological leveling into parallel groups
//! - Bounded parallel execution with per-task deadlines and failure isolation
//! - Deterministic batch reports
//!
//! # Architecture
//!
//! ```text
//! Vec<Task<P>>
//!   ↓
//! TaskGraph::from_tasks()  → duplicates, unknown-dependency policy
//!   ↓
//! TaskGraph::validate()    → detect_cycles()
//!   ↓
//! TaskGraph::topological_sort() → Vec<ParallelGroup<P>>
//!   ↓
//! ExecutionEngine::run_levels() → execute_stage_parallel() per level
//!   ↓
//! ResultAggregator::finish() → BatchResult<O>
//! ```

mod aggregate;
mod cycle;
mod engine;
mod graph;
mod level;
mod output;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::{execute_tasks, plan, AvailabilityFn, ExecutionEngine, ExecutionEngineBuilder};
pub use graph::TaskGraph;
pub use traits::{
    BlockingFnRunner, FnRunner, OutputRendererPlugin, RenderEvent, RunSummary, TaskRunner,
    TaskSummary,
};
pub use types::{BatchResult, ParallelGroup, Task, TaskNode, TaskResult};
