//! Line-oriented decoding of control connections.
//!
//! A connection carries newline-terminated commands. Recognised commands are
//! handed to the sink in order; anything else is skipped. Nothing is ever
//! written back to the client.

use std::io::{self, BufRead, BufReader, Read};
use std::os::unix::net::UnixStream;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::command::ControlCommand;

use super::{CommandSink, LISTENER_TARGET};

const MAX_COMMAND_BYTES: usize = 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// What the listener should do after a connection has been drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ConnectionOutcome {
    /// Keep accepting connections.
    Continue,
    /// A Stop was delivered or the sink closed; accept nothing further.
    Draining,
}

pub(super) fn handle_connection<S>(stream: UnixStream, sink: &S) -> ConnectionOutcome
where
    S: CommandSink,
{
    if let Err(error) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            "failed to set control connection read timeout"
        );
    }
    decode_commands(BufReader::new(stream), sink)
}

pub(super) fn decode_commands<R, S>(mut reader: R, sink: &S) -> ConnectionOutcome
where
    R: BufRead,
    S: CommandSink,
{
    loop {
        let line = match read_command_line(&mut reader) {
            Ok(Some(line)) => line,
            Ok(None) => return ConnectionOutcome::Continue,
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "dropping control connection"
                );
                return ConnectionOutcome::Continue;
            }
        };

        let Ok(command) = ControlCommand::from_str(&line) else {
            debug!(
                target: LISTENER_TARGET,
                command = %line,
                "ignoring unrecognised control command"
            );
            continue;
        };

        info!(
            target: LISTENER_TARGET,
            %command,
            "control command received"
        );
        if sink.deliver(command).is_err() {
            warn!(
                target: LISTENER_TARGET,
                %command,
                "supervisor is no longer taking commands"
            );
            return ConnectionOutcome::Draining;
        }
        if command == ControlCommand::Stop {
            return ConnectionOutcome::Draining;
        }
    }
}

/// Reads one command line without its terminator.
///
/// Returns `Ok(None)` at end of stream. A final line without a trailing
/// newline is still returned. Lines longer than [`MAX_COMMAND_BYTES`] are
/// rejected.
fn read_command_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: BufRead,
{
    let mut buffer = Vec::new();
    let limit = u64::try_from(MAX_COMMAND_BYTES + 1).unwrap_or(u64::MAX);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buffer)?;
    if read == 0 {
        return Ok(None);
    }
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
    } else if buffer.len() > MAX_COMMAND_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "command exceeds maximum size",
        ));
    }
    if buffer.last() == Some(&b'\r') {
        buffer.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}
