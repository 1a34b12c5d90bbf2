/// Stable numeric codes for scheduler failures, suitable for process exit
/// codes and machine-readable renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 3,
    DependencyError = 11,
    CircularDependency = 12,
    Timeout = 30,
    Skipped = 31,
    Panicked = 32,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
