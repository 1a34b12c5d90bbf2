pub mod load;
pub mod types;

pub use load::{apply_overrides, load_from_path, load_from_str};
pub use types::{LoggingConfig, OutputConfig, SchedulerConfig, UnknownDependencyPolicy};
