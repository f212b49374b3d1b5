//! Control client behind `--signal <op>`.
//!
//! The client connects to a running supervisor, writes a single command line
//! and disconnects. The protocol has no acknowledgement, so success only means
//! the line was written.

use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::str::FromStr;
use std::time::Duration;

use camino::Utf8PathBuf;
use socket2::{Domain, SockAddr, Socket, Type};
use tether_config::ControlEndpoint;
use thiserror::Error;
use tracing::info;

use crate::command::ControlCommand;
use crate::exit::FailureCode;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by the control client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No supervisor accepted the connection.
    #[error("failed to connect to supervisor at {socket}: {source}")]
    Connect {
        /// Socket path that was tried.
        socket: Utf8PathBuf,
        /// Underlying connection error.
        #[source]
        source: io::Error,
    },
    /// The requested operation is not a control command.
    #[error("unsupported operation '{operation}'; expected 'stop' or 'restart'")]
    UnknownOperation {
        /// Operation as given on the command line.
        operation: String,
    },
    /// The command could not be written.
    #[error("failed to send '{command}' to supervisor: {source}")]
    Send {
        /// Command being sent.
        command: ControlCommand,
        /// Underlying write error.
        #[source]
        source: io::Error,
    },
}

impl ClientError {
    /// Exit code reported by the client for this error.
    #[must_use]
    pub const fn exit_code(&self) -> FailureCode {
        FailureCode::ControlClient
    }
}

/// Sends `operation` to the supervisor listening on `endpoint`.
///
/// The connection is made before the operation is validated, so an
/// unreachable supervisor is reported even for a bogus operation.
pub(crate) fn send_command(
    endpoint: &ControlEndpoint,
    operation: &str,
) -> Result<ControlCommand, ClientError> {
    let mut stream = connect(endpoint).map_err(|source| ClientError::Connect {
        socket: endpoint.socket_path().to_owned(),
        source,
    })?;
    let command =
        ControlCommand::from_str(operation).map_err(|_| ClientError::UnknownOperation {
            operation: operation.to_owned(),
        })?;
    stream
        .write_all(command.to_line().as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|source| ClientError::Send { command, source })?;
    info!(
        target: CLIENT_TARGET,
        command = %command,
        endpoint = %endpoint,
        "control command sent"
    );
    Ok(command)
}

fn connect(endpoint: &ControlEndpoint) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(endpoint.socket_path())?;
    socket.connect_timeout(&address, CONNECT_TIMEOUT)?;
    Ok(UnixStream::from(OwnedFd::from(socket)))
}
