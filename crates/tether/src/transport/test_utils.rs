//! Test helpers for the transport module.

use std::sync::{Arc, Mutex};

use crate::command::ControlCommand;

use super::{CommandSink, SinkClosed};

/// Sink that records every delivered command.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSink {
    commands: Arc<Mutex<Vec<ControlCommand>>>,
    closed: bool,
}

impl RecordingSink {
    pub(crate) fn closed() -> Self {
        Self {
            closed: true,
            ..Self::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<ControlCommand> {
        self.commands.lock().expect("recording sink poisoned").clone()
    }
}

impl CommandSink for RecordingSink {
    fn deliver(&self, command: ControlCommand) -> Result<(), SinkClosed> {
        if self.closed {
            return Err(SinkClosed);
        }
        self.commands
            .lock()
            .expect("recording sink poisoned")
            .push(command);
        Ok(())
    }
}
