//! Control endpoint listener for the supervisor.
//!
//! The listener binds the supervisor's Unix socket, accepts connections one
//! at a time on a background thread, and hands every recognised command to a
//! [`CommandSink`]. It never touches supervisor state itself.

mod decode;
mod errors;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::listener::ControlListener;
#[cfg(test)]
pub(crate) use self::test_utils::RecordingSink;

use crate::command::ControlCommand;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Receiver of decoded control commands.
pub(crate) trait CommandSink: Send + 'static {
    /// Hands `command` over, blocking until the consumer has taken it.
    fn deliver(&self, command: ControlCommand) -> Result<(), SinkClosed>;
}

/// The consumer behind a [`CommandSink`] has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SinkClosed;
