use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, Sender};

use tracing::debug;

use crate::command::ControlCommand;
use crate::worker::{ProcessSpawner, WorkerHandle, WorkerId};

use super::SUPERVISOR_TARGET;
use super::event::SupervisorEvent;
use super::reporter::{LifecycleReporter, StopReason};

/// Single-consumer event loop owning the supervisor state.
///
/// Exactly one event is handled per iteration. Stop and restart drain the
/// current worker's completion before anything else happens, so an explicit
/// termination is never mistaken for a crash.
pub(super) struct SupervisorLoop<'r, R> {
    inbox: Receiver<SupervisorEvent>,
    state: SupervisorState<'r, R>,
}

struct SupervisorState<'r, R> {
    serving: bool,
    worker: WorkerHandle,
    spawner: ProcessSpawner,
    events: Sender<SupervisorEvent>,
    reporter: &'r R,
}

impl<'r, R> SupervisorLoop<'r, R>
where
    R: LifecycleReporter,
{
    /// Spawns the initial worker and enters the serving state.
    pub(super) fn start(
        spawner: ProcessSpawner,
        events: Sender<SupervisorEvent>,
        inbox: Receiver<SupervisorEvent>,
        reporter: &'r R,
    ) -> Self {
        let worker = spawner.spawn(WorkerId::FIRST, &events);
        reporter.worker_spawned(worker.id(), worker.pid());
        Self {
            inbox,
            state: SupervisorState {
                serving: true,
                worker,
                spawner,
                events,
                reporter,
            },
        }
    }

    /// Handles events until the supervisor stops.
    ///
    /// The worker has been terminated by the time this returns. Dropping the
    /// inbox here releases a control listener blocked on delivery.
    pub(super) fn run(self) -> StopReason {
        let Self { inbox, mut state } = self;
        for event in &inbox {
            if let ControlFlow::Break(reason) = state.handle(event) {
                return reason;
            }
        }
        state.stop(StopReason::Abandoned)
    }
}

impl<R> SupervisorState<'_, R>
where
    R: LifecycleReporter,
{
    fn handle(&mut self, event: SupervisorEvent) -> ControlFlow<StopReason> {
        match event {
            SupervisorEvent::Control { command, received } => {
                // Capacity one and a single send: this never blocks.
                received.send(()).ok();
                self.reporter.command_received(command);
                match command {
                    ControlCommand::Stop => ControlFlow::Break(self.stop(StopReason::Command)),
                    ControlCommand::Restart => {
                        self.restart();
                        ControlFlow::Continue(())
                    }
                }
            }
            SupervisorEvent::Signal { signal } => {
                ControlFlow::Break(self.stop(StopReason::Signal(signal)))
            }
            SupervisorEvent::WorkerExited(worker) => {
                self.respawn_after_exit(worker);
                ControlFlow::Continue(())
            }
        }
    }

    fn respawn_after_exit(&mut self, worker: WorkerId) {
        if !self.serving {
            return;
        }
        if worker != self.worker.id() {
            debug!(
                target: SUPERVISOR_TARGET,
                worker = %worker,
                current = %self.worker.id(),
                "ignoring exit of replaced worker"
            );
            return;
        }
        let Some(exit) = self.worker.try_exit() else {
            debug!(
                target: SUPERVISOR_TARGET,
                worker = %worker,
                "worker exit already consumed"
            );
            return;
        };
        self.reporter.worker_exited(worker, &exit);
        self.replace_worker();
    }

    fn restart(&mut self) {
        self.terminate_worker();
        self.replace_worker();
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.terminate_worker();
        self.serving = false;
        self.reporter.supervisor_stopping(reason);
        reason
    }

    fn terminate_worker(&self) {
        let termination = self.worker.terminate();
        self.reporter.worker_terminated(self.worker.id(), &termination);
    }

    fn replace_worker(&mut self) {
        let next = self.worker.id().next();
        self.worker = self.spawner.spawn(next, &self.events);
        self.reporter.worker_spawned(self.worker.id(), self.worker.pid());
    }
}
