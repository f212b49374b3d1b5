//! Error types for control listener operations.

use std::io;

use thiserror::Error;

/// Errors surfaced while binding or running the control listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind control socket at {path}: {source}")]
    Bind {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("control socket {path} is already in use")]
    InUse { path: String },
    #[error("control socket path {path} is not a socket")]
    NotSocket { path: String },
    #[error("failed to read metadata for control socket {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to existing control socket {path}: {source}")]
    LivenessCheck {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale control socket {path}: {source}")]
    Cleanup {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[error("failed to start listener thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("listener thread panicked")]
    ThreadPanic,
}
