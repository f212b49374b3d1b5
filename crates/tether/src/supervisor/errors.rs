use thiserror::Error;

use crate::transport::ListenerError;

/// Errors that abort the supervisor.
///
/// Only the control endpoint is fatal; worker failures are handled by the
/// respawn policy and never surface here.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The control listener could not be bound or started.
    #[error("failed to open control endpoint: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

impl From<ListenerError> for SupervisorError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}
