//! Worker process spawning and monitoring.
//!
//! Each spawned worker gets a monitor thread that waits for the process and
//! latches its exit into the worker's [`WorkerHandle`]. The latch holds one
//! value and is filled exactly once, so an exit is never lost even when the
//! supervisor is busy elsewhere.

mod handle;
mod spawner;

pub(crate) use self::handle::{Termination, WorkerExit, WorkerHandle, WorkerId};
pub(crate) use self::spawner::{ExitNotifier, ProcessSpawner};

const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");
