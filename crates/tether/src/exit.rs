//! Process exit codes for the one-shot and supervisor roles.

use std::process::ExitCode;

/// Failure classes reported through the process exit status.
///
/// Every success path exits with `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// The control client could not deliver its command.
    ControlClient = 1,
    /// The launcher could not start a supervisor.
    Daemon = 2,
    /// The supervisor could not open its control endpoint.
    Supervisor = 3,
}

impl FailureCode {
    /// Numeric exit status.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<FailureCode> for ExitCode {
    fn from(failure: FailureCode) -> Self {
        Self::from(failure.code())
    }
}

impl From<FailureCode> for i32 {
    fn from(failure: FailureCode) -> Self {
        Self::from(failure.code())
    }
}
