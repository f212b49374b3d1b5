//! Structured reporting of supervisor lifecycle events.

use std::fmt;
use std::sync::Arc;

use tether_config::ControlEndpoint;

use crate::command::ControlCommand;
use crate::worker::{Termination, WorkerExit, WorkerId};

use super::SUPERVISOR_TARGET;

/// Why the supervisor loop left the serving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// An operator sent `stop` over the control endpoint.
    Command,
    /// The supervisor process received a termination signal.
    Signal(i32),
    /// Every event source disappeared.
    Abandoned,
}

impl fmt::Display for StopReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => formatter.write_str("stop command"),
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::Abandoned => formatter.write_str("event sources closed"),
        }
    }
}

/// Observer of supervisor lifecycle events.
pub(crate) trait LifecycleReporter: Send + Sync {
    /// The control endpoint is bound and the loop is about to start.
    fn supervisor_started(&self, endpoint: &ControlEndpoint);

    /// A worker has been started (or its start has failed).
    fn worker_spawned(&self, worker: WorkerId, pid: Option<u32>);

    /// A worker ended without being asked to.
    fn worker_exited(&self, worker: WorkerId, exit: &WorkerExit);

    /// A worker was terminated on request.
    fn worker_terminated(&self, worker: WorkerId, termination: &Termination);

    /// The loop accepted a control command.
    fn command_received(&self, command: ControlCommand);

    /// The loop left the serving state.
    fn supervisor_stopping(&self, reason: StopReason);

    /// The control endpoint has been released.
    fn supervisor_stopped(&self);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn supervisor_started(&self, endpoint: &ControlEndpoint) {
        (**self).supervisor_started(endpoint);
    }

    fn worker_spawned(&self, worker: WorkerId, pid: Option<u32>) {
        (**self).worker_spawned(worker, pid);
    }

    fn worker_exited(&self, worker: WorkerId, exit: &WorkerExit) {
        (**self).worker_exited(worker, exit);
    }

    fn worker_terminated(&self, worker: WorkerId, termination: &Termination) {
        (**self).worker_terminated(worker, termination);
    }

    fn command_received(&self, command: ControlCommand) {
        (**self).command_received(command);
    }

    fn supervisor_stopping(&self, reason: StopReason) {
        (**self).supervisor_stopping(reason);
    }

    fn supervisor_stopped(&self) {
        (**self).supervisor_stopped();
    }
}

/// Reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StructuredLifecycleReporter;

impl LifecycleReporter for StructuredLifecycleReporter {
    fn supervisor_started(&self, endpoint: &ControlEndpoint) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "supervisor_started",
            endpoint = %endpoint,
            pid = std::process::id(),
            "supervisor serving"
        );
    }

    fn worker_spawned(&self, worker: WorkerId, pid: Option<u32>) {
        match pid {
            Some(pid) => tracing::info!(
                target: SUPERVISOR_TARGET,
                event = "worker_spawned",
                worker = %worker,
                pid,
                "worker running"
            ),
            None => tracing::warn!(
                target: SUPERVISOR_TARGET,
                event = "worker_spawned",
                worker = %worker,
                "worker did not start"
            ),
        }
    }

    fn worker_exited(&self, worker: WorkerId, exit: &WorkerExit) {
        tracing::warn!(
            target: SUPERVISOR_TARGET,
            event = "worker_exited",
            worker = %worker,
            exit = %exit,
            "worker exited unexpectedly; respawning"
        );
    }

    fn worker_terminated(&self, worker: WorkerId, termination: &Termination) {
        match termination {
            Termination::AlreadyExited(exit) | Termination::Killed(exit) => tracing::info!(
                target: SUPERVISOR_TARGET,
                event = "worker_terminated",
                worker = %worker,
                exit = %exit,
                "worker terminated"
            ),
            Termination::Unconfirmed => tracing::warn!(
                target: SUPERVISOR_TARGET,
                event = "worker_terminated",
                worker = %worker,
                "worker killed but its exit was never observed"
            ),
            Termination::SignalFailed(errno) => tracing::warn!(
                target: SUPERVISOR_TARGET,
                event = "worker_terminated",
                worker = %worker,
                error = %errno,
                "worker could not be killed; abandoning it"
            ),
        }
    }

    fn command_received(&self, command: ControlCommand) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "command_received",
            command = %command,
            "control command received"
        );
    }

    fn supervisor_stopping(&self, reason: StopReason) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "supervisor_stopping",
            reason = %reason,
            "supervisor stopping"
        );
    }

    fn supervisor_stopped(&self) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "supervisor_stopped",
            "control endpoint released; supervisor exiting"
        );
    }
}
