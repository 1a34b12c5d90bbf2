pub mod code;
pub mod scheduler;
pub mod task;

pub use code::ErrorCode;
pub use scheduler::SchedulerError;
pub use task::TaskError;
