use std::fmt;
use std::process::ExitStatus;
use std::sync::mpsc::{Receiver, TryRecvError};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::warn;

use super::WORKER_TARGET;

/// Sequence number distinguishing successive workers of one supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct WorkerId(u64);

impl WorkerId {
    pub(crate) const FIRST: Self = Self(1);

    pub(crate) const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// How a worker process ended.
#[derive(Debug)]
pub(crate) enum WorkerExit {
    /// The process terminated with the given status.
    Exited(ExitStatus),
    /// The process could not be started at all.
    SpawnFailed,
    /// Waiting for the process failed; it is treated as gone.
    WaitFailed,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(status) => write!(formatter, "{status}"),
            Self::SpawnFailed => formatter.write_str("spawn failed"),
            Self::WaitFailed => formatter.write_str("wait failed"),
        }
    }
}

/// Result of asking a worker to terminate.
#[derive(Debug)]
pub(crate) enum Termination {
    /// The worker had already exited; its completion has been consumed.
    AlreadyExited(WorkerExit),
    /// The kill signal was delivered and the completion consumed.
    Killed(WorkerExit),
    /// The kill signal was delivered but the monitor vanished without
    /// reporting an exit.
    Unconfirmed,
    /// The kill signal could not be delivered.
    SignalFailed(Errno),
}

/// Exclusive handle on one spawned worker.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    id: WorkerId,
    pid: Option<u32>,
    exit: Receiver<WorkerExit>,
}

impl WorkerHandle {
    pub(super) const fn new(id: WorkerId, pid: Option<u32>, exit: Receiver<WorkerExit>) -> Self {
        Self { id, pid, exit }
    }

    pub(crate) const fn id(&self) -> WorkerId {
        self.id
    }

    /// Operating system process id, absent when the spawn failed.
    pub(crate) const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Takes the latched exit without blocking.
    pub(crate) fn try_exit(&self) -> Option<WorkerExit> {
        match self.exit.try_recv() {
            Ok(exit) => Some(exit),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the exit is latched.
    ///
    /// Returns `None` when the completion was already consumed or the monitor
    /// went away without reporting.
    pub(crate) fn wait(&self) -> Option<WorkerExit> {
        self.exit.recv().ok()
    }

    /// Forcefully kills the worker and consumes its completion.
    ///
    /// There is no graceful negotiation with the worker: the process receives
    /// `SIGKILL`. When the signal cannot be delivered the completion is left
    /// untouched.
    pub(crate) fn terminate(&self) -> Termination {
        if let Some(exit) = self.try_exit() {
            return Termination::AlreadyExited(exit);
        }
        let Some(raw) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return Termination::SignalFailed(Errno::ESRCH);
        };
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => match self.wait() {
                Some(exit) => Termination::Killed(exit),
                None => Termination::Unconfirmed,
            },
            Err(errno) => {
                warn!(
                    target: WORKER_TARGET,
                    worker = %self.id,
                    pid = raw,
                    error = %errno,
                    "failed to signal worker"
                );
                Termination::SignalFailed(errno)
            }
        }
    }
}
