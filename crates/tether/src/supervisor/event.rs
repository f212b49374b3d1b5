use std::sync::mpsc::{self, Sender, SyncSender};

use crate::command::ControlCommand;
use crate::transport::{CommandSink, SinkClosed};
use crate::worker::{ExitNotifier, WorkerId};

/// Input to the supervisor loop.
#[derive(Debug)]
pub(super) enum SupervisorEvent {
    /// A command decoded by the control listener.
    ///
    /// The loop acknowledges receipt through `received`; the listener blocks
    /// on that acknowledgement before accepting further connections.
    Control {
        command: ControlCommand,
        received: SyncSender<()>,
    },
    /// A termination signal was delivered to the supervisor process.
    Signal { signal: i32 },
    /// The monitor of `worker` latched its exit.
    WorkerExited(WorkerId),
}

impl ExitNotifier for Sender<SupervisorEvent> {
    fn worker_exited(&self, worker: WorkerId) {
        // The loop has already stopped when the receiver is gone.
        self.send(SupervisorEvent::WorkerExited(worker)).ok();
    }
}

/// Command sink handing control commands to the supervisor loop.
#[derive(Debug)]
pub(super) struct ControlSink {
    events: Sender<SupervisorEvent>,
}

impl ControlSink {
    pub(super) const fn new(events: Sender<SupervisorEvent>) -> Self {
        Self { events }
    }
}

impl CommandSink for ControlSink {
    fn deliver(&self, command: ControlCommand) -> Result<(), SinkClosed> {
        let (received, acknowledged) = mpsc::sync_channel(1);
        self.events
            .send(SupervisorEvent::Control { command, received })
            .map_err(|_| SinkClosed)?;
        acknowledged.recv().map_err(|_| SinkClosed)
    }
}
