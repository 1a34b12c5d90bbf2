use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchedulerError;

/// How a dependency naming a task outside the batch is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDependencyPolicy {
    /// Reject the batch with `SchedulerError::UnknownDependency`.
    Fail,
    /// Assume the dependency already completed; it contributes no in-degree.
    TreatAsSatisfied,
}

/// Scheduler configuration for a single batch.
///
/// No `Default`: the unknown-dependency policy must be
/// chosen by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum tasks running at once within one level.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-task deadline, written in (fractional) seconds in TOML.
    #[serde(
        rename = "timeout_per_task_secs",
        default = "default_timeout_per_task",
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub timeout_per_task: Duration,

    /// Stop scheduling later levels once any task in a level fails.
    #[serde(default)]
    pub fail_fast: bool,

    pub unknown_dependency_policy: UnknownDependencyPolicy,

    /// Skip transitive dependents of a failed task instead of running them.
    #[serde(default)]
    pub skip_dependents_on_failure: bool,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_workers() -> usize {
    4
}

fn default_timeout_per_task() -> Duration {
    Duration::from_secs(300)
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl SchedulerConfig {
    pub fn new(
        max_workers: usize,
        timeout_per_task: Duration,
        fail_fast: bool,
        unknown_dependency_policy: UnknownDependencyPolicy,
    ) -> Self {
        Self {
            max_workers,
            timeout_per_task,
            fail_fast,
            unknown_dependency_policy,
            skip_dependents_on_failure: false,
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn with_skip_dependents_on_failure(mut self, enabled: bool) -> Self {
        self.skip_dependents_on_failure = enabled;
        self
    }

    /// Reject values the executor cannot honour.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_workers < 1 {
            return Err(SchedulerError::InvalidConfiguration(format!(
                "max_workers must be >= 1 (got {})",
                self.max_workers
            )));
        }
        if self.max_workers > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(SchedulerError::InvalidConfiguration(format!(
                "max_workers must be <= {} (got {})",
                tokio::sync::Semaphore::MAX_PERMITS,
                self.max_workers
            )));
        }
        if self.timeout_per_task.is_zero() {
            return Err(SchedulerError::InvalidConfiguration(
                "timeout_per_task must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Renderer selection for execution events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "text", "jsonl", "progress" or "none".
    #[serde(default = "default_output_format")]
    pub format: String,
    #[serde(default)]
    pub ascii_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            ascii_only: false,
        }
    }
}

fn default_output_format() -> String {
    "none".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "dagrun_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}
