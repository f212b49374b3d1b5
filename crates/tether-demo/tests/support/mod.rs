//! Shared harness for end-to-end tests of the demo binary.
//!
//! Each [`Install`] places its own copy of the binary in a fresh temporary
//! directory, so every test owns a private `.proc` control endpoint.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Output;
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempfile::TempDir;

const DEMO_BINARY: &str = env!("CARGO_BIN_EXE_tether-demo");
const TEXT_FILE_BUSY: i32 = 26;
pub const PATIENCE: Duration = Duration::from_secs(10);

pub struct Install {
    dir: TempDir,
}

impl Install {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let executable = dir.path().join("app");
        if fs::hard_link(DEMO_BINARY, &executable).is_err() {
            fs::copy(DEMO_BINARY, &executable).expect("copy demo binary");
        }
        Self { dir }
    }

    pub fn executable(&self) -> PathBuf {
        self.dir.path().join("app")
    }

    pub fn proc_dir(&self) -> PathBuf {
        self.dir.path().join(".proc")
    }

    pub fn socket(&self) -> PathBuf {
        self.proc_dir().join("sock")
    }

    pub fn ledger(&self) -> PathBuf {
        self.dir.path().join("ledger")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(self.executable());
        command
            .args(args)
            .env_remove("TETHER_ROLE")
            .env("TETHER_DEMO_LEDGER", self.ledger())
            .env("TETHER_LOG", "info")
            .env("TETHER_LOG_FORMAT", "compact")
            .timeout(PATIENCE);
        command
    }

    /// Runs the binary, retrying while a concurrently forked test process
    /// still holds the freshly copied executable open for writing.
    pub fn run_with(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut attempts = 0;
        loop {
            let mut command = self.command(args);
            for (key, value) in envs {
                command.env(key, value);
            }
            match command.output() {
                Err(error) if is_text_file_busy(&error) && attempts < 20 => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(50));
                }
                result => return result.expect("run demo binary"),
            }
        }
    }

    /// Launches a supervisor and waits for its first worker.
    pub fn start_daemon(&self, envs: &[(&str, &str)]) -> Supervised<'_> {
        let output = self.run_with(&["--daemon"], envs);
        assert!(output.status.success(), "launch failed: {output:?}");
        assert!(
            eventually(|| self.socket().exists()),
            "control endpoint never appeared"
        );
        assert!(
            eventually(|| !self.workers().is_empty()),
            "no worker was started"
        );
        Supervised { install: self }
    }

    /// Process ids of every worker that has started, oldest first.
    pub fn workers(&self) -> Vec<u32> {
        self.ledger_entries("worker")
    }

    pub fn ledger_entries(&self, label: &str) -> Vec<u32> {
        self.ledger_records(label)
            .into_iter()
            .map(|(pid, _)| pid)
            .collect()
    }

    /// Process id of the supervisor, taken from the first worker's parent.
    pub fn supervisor(&self) -> u32 {
        self.ledger_records("worker")
            .first()
            .map(|(_, parent)| *parent)
            .expect("a worker has recorded its supervisor")
    }

    /// `(pid, parent pid)` pairs recorded under `label`, oldest first.
    fn ledger_records(&self, label: &str) -> Vec<(u32, u32)> {
        let Ok(contents) = fs::read_to_string(self.ledger()) else {
            return Vec::new();
        };
        contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                if fields.next()? != label {
                    return None;
                }
                let pid = fields.next()?.parse().ok()?;
                let parent = fields.next()?.parse().ok()?;
                Some((pid, parent))
            })
            .collect()
    }
}

/// Stops the supervisor and reaps stray workers when a test ends.
pub struct Supervised<'a> {
    install: &'a Install,
}

impl Drop for Supervised<'_> {
    fn drop(&mut self) {
        if self.install.socket().exists() {
            let mut command = self.install.command(&["--signal", "stop"]);
            command.output().ok();
            eventually(|| !self.install.socket().exists());
        }
        for pid in self.install.workers() {
            if is_alive(pid) {
                signal(pid, Signal::SIGKILL).ok();
            }
        }
    }
}

pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    condition()
}

pub fn signal(pid: u32, signal: Signal) -> nix::Result<()> {
    let raw = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
    kill(Pid::from_raw(raw), signal)
}

/// Checks `pid` with the null signal.
///
/// Workers are children of the supervisor, which reaps them, so a dead worker
/// reports `ESRCH` here rather than lingering as a zombie.
pub fn is_alive(pid: u32) -> bool {
    i32::try_from(pid).is_ok_and(|raw| kill(Pid::from_raw(raw), None).is_ok())
}

/// Reports whether `pid` is a process that has not yet exited.
///
/// The supervisor is orphaned once the launcher exits, so after stopping it
/// may linger as a zombie until its new parent reaps it. Zombies count as
/// gone here.
pub fn is_running(pid: u32) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    stat.rsplit_once(')')
        .and_then(|(_, fields)| fields.split_whitespace().next())
        .is_some_and(|state| !matches!(state, "Z" | "X"))
}

fn is_text_file_busy(error: &io::Error) -> bool {
    error.raw_os_error() == Some(TEXT_FILE_BUSY)
}
