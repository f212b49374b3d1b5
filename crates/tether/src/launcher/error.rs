use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use tether_config::EndpointError;
use thiserror::Error;

use crate::exit::FailureCode;

/// Errors raised while launching a supervisor.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The control endpoint exists, so a supervisor is considered running.
    #[error("supervisor already running: control endpoint {socket} exists")]
    AlreadyRunning {
        /// Socket path that was found.
        socket: Utf8PathBuf,
    },
    /// The endpoint directory could not be created.
    #[error(transparent)]
    Directory {
        /// Underlying endpoint error.
        #[from]
        source: EndpointError,
    },
    /// The supervisor process could not be started.
    #[error("failed to start supervisor '{}': {source}", executable.display())]
    Spawn {
        /// Executable that was re-run.
        executable: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Exit code reported by the launcher for this error.
    #[must_use]
    pub const fn exit_code(&self) -> FailureCode {
        FailureCode::Daemon
    }
}
