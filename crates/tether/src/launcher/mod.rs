//! One-shot launcher behind `--daemon`.
//!
//! The launcher refuses to start a second supervisor while the control
//! endpoint exists, prepares the endpoint directory, starts the supervisor
//! detached from the current session and returns without waiting for it.

mod error;
mod spawning;

use std::ffi::OsString;
use std::path::Path;

use tether_config::ControlEndpoint;
use tracing::info;

pub use self::error::LaunchError;
pub(crate) use self::spawning::{DetachedSpawner, SupervisorSpawner};

const LAUNCHER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launcher");

/// Starts a supervisor for `executable` unless one is already running.
///
/// Returns the supervisor's process id.
pub(crate) fn launch<S>(
    endpoint: &ControlEndpoint,
    executable: &Path,
    args: &[OsString],
    spawner: &S,
) -> Result<u32, LaunchError>
where
    S: SupervisorSpawner,
{
    if endpoint.exists() {
        return Err(LaunchError::AlreadyRunning {
            socket: endpoint.socket_path().to_owned(),
        });
    }
    endpoint.prepare_directory()?;
    let pid = spawner
        .spawn_supervisor(executable, args)
        .map_err(|source| LaunchError::Spawn {
            executable: executable.to_path_buf(),
            source,
        })?;
    info!(
        target: LAUNCHER_TARGET,
        pid,
        endpoint = %endpoint,
        "supervisor launched"
    );
    Ok(pid)
}
