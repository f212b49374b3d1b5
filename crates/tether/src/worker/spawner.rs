use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::mpsc::{self, SyncSender};
use std::thread;

use tracing::{info, warn};

use crate::role::{ROLE_ENV_VAR, RoleMarker};

use super::{WORKER_TARGET, WorkerExit, WorkerHandle, WorkerId};

/// Wakes the supervisor once a worker's exit has been latched.
pub(crate) trait ExitNotifier: Clone + Send + 'static {
    /// Called exactly once per spawned worker, after its exit is latched.
    fn worker_exited(&self, worker: WorkerId);
}

/// Starts worker processes from a fixed command line.
#[derive(Debug, Clone)]
pub(crate) struct ProcessSpawner {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl ProcessSpawner {
    /// Spawner running `program` with `args` verbatim.
    pub(crate) fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
            envs: Vec::new(),
        }
    }

    /// Spawner re-executing the current program as a worker.
    ///
    /// The worker marker names the calling process as the supervisor. It is
    /// applied once here and reused for every respawn.
    pub(crate) fn for_worker(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        let marker = RoleMarker::worker_of_current_process().encode();
        Self::new(program, args).with_env(ROLE_ENV_VAR, marker)
    }

    pub(crate) fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Starts one worker.
    ///
    /// A failed spawn is not reported separately: the returned handle already
    /// carries a [`WorkerExit::SpawnFailed`] completion and `notifier` is
    /// called before returning, exactly as if the process had crashed
    /// immediately.
    pub(crate) fn spawn<N>(&self, id: WorkerId, notifier: &N) -> WorkerHandle
    where
        N: ExitNotifier,
    {
        let (latch, exit) = mpsc::sync_channel(1);
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.envs {
            command.env(key, value);
        }

        match command.spawn() {
            Ok(child) => {
                let pid = child.id();
                info!(
                    target: WORKER_TARGET,
                    worker = %id,
                    pid,
                    program = %self.program.display(),
                    "worker spawned"
                );
                let notifier = notifier.clone();
                thread::spawn(move || monitor(child, id, &latch, &notifier));
                WorkerHandle::new(id, Some(pid), exit)
            }
            Err(error) => {
                warn!(
                    target: WORKER_TARGET,
                    worker = %id,
                    program = %self.program.display(),
                    error = %error,
                    "failed to spawn worker"
                );
                latch_exit(&latch, WorkerExit::SpawnFailed);
                notifier.worker_exited(id);
                WorkerHandle::new(id, None, exit)
            }
        }
    }
}

fn monitor<N>(mut child: Child, id: WorkerId, latch: &SyncSender<WorkerExit>, notifier: &N)
where
    N: ExitNotifier,
{
    let exit = match child.wait() {
        Ok(status) => WorkerExit::Exited(status),
        Err(error) => {
            warn!(
                target: WORKER_TARGET,
                worker = %id,
                error = %error,
                "failed to wait for worker"
            );
            WorkerExit::WaitFailed
        }
    };
    latch_exit(latch, exit);
    notifier.worker_exited(id);
}

fn latch_exit(latch: &SyncSender<WorkerExit>, exit: WorkerExit) {
    // Each latch has exactly one producer and room for one value, so the
    // send only fails once the handle has been dropped.
    if latch.try_send(exit).is_err() {
        tracing::debug!(
            target: WORKER_TARGET,
            "worker handle already released; exit discarded"
        );
    }
}
