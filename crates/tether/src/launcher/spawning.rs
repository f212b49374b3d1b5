use std::ffi::OsString;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::unistd::setsid;

use crate::role::{ROLE_ENV_VAR, RoleMarker};

/// Starts the supervisor process on behalf of the launcher.
pub(crate) trait SupervisorSpawner {
    /// Starts `executable` in the supervisor role and returns its pid.
    fn spawn_supervisor(&self, executable: &Path, args: &[OsString]) -> io::Result<u32>;
}

/// Spawner that detaches the supervisor from the launcher.
///
/// The child runs in a new session with all standard streams on the null
/// device and is never waited on.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DetachedSpawner;

impl SupervisorSpawner for DetachedSpawner {
    fn spawn_supervisor(&self, executable: &Path, args: &[OsString]) -> io::Result<u32> {
        let mut command = Command::new(executable);
        command
            .args(args)
            .env(ROLE_ENV_VAR, RoleMarker::Supervisor.encode())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // SAFETY: the hook only calls setsid(2), which is async-signal-safe
        // and does not allocate.
        unsafe {
            command.pre_exec(|| setsid().map(|_| ()).map_err(io::Error::from));
        }
        let child = command.spawn()?;
        Ok(child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_reported() {
        let error = DetachedSpawner
            .spawn_supervisor(Path::new("/nonexistent/tether-app"), &[])
            .expect_err("spawn must fail");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }
}
