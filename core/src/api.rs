//! Stable re-exports for consumers (`plugins` and external crates).
//!
//! Prefer importing from `dagrun_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_from_path, load_from_str, LoggingConfig, OutputConfig, SchedulerConfig,
    UnknownDependencyPolicy,
};
pub use crate::error::{ErrorCode, SchedulerError, TaskError};
pub use crate::executor::{
    execute_tasks, plan, AvailabilityFn, BatchResult, BlockingFnRunner, ExecutionEngine,
    ExecutionEngineBuilder, FnRunner, OutputRendererPlugin, ParallelGroup, RenderEvent,
    RunSummary, Task, TaskGraph, TaskResult, TaskRunner, TaskSummary,
};
pub use crate::logging::init_tracing;
