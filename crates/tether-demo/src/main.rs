//! Small application run under tether supervision.
//!
//! Each run appends `<role> <pid> <parent pid>` to the file named by
//! `TETHER_DEMO_LEDGER` (when set) and then idles. For a worker the parent is
//! its supervisor. Setting
//! `TETHER_DEMO_LIFETIME_MS` makes the process exit with status 1 after that
//! many milliseconds, which under a supervisor looks like a crash.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::process::parent_id;
use std::process::{self, ExitCode};
use std::thread;
use std::time::Duration;

use tether::ProcessRole;

const LEDGER_ENV_VAR: &str = "TETHER_DEMO_LEDGER";
const LIFETIME_ENV_VAR: &str = "TETHER_DEMO_LIFETIME_MS";
const IDLE_TICK: Duration = Duration::from_secs(60);

fn main() -> ExitCode {
    let role = tether::bootstrap();
    if let Err(error) = record(&role) {
        eprintln!("tether-demo: failed to update ledger: {error}");
        return ExitCode::FAILURE;
    }

    match lifetime() {
        Some(lifetime) => {
            thread::sleep(lifetime);
            ExitCode::FAILURE
        }
        None => loop {
            thread::sleep(IDLE_TICK);
        },
    }
}

fn record(role: &ProcessRole) -> io::Result<()> {
    let Some(path) = env::var_os(LEDGER_ENV_VAR) else {
        return Ok(());
    };
    let label = match role {
        ProcessRole::Worker => "worker",
        _ => "standalone",
    };
    let mut ledger = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(ledger, "{label} {} {}", process::id(), parent_id())
}

fn lifetime() -> Option<Duration> {
    env::var(LIFETIME_ENV_VAR)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .map(Duration::from_millis)
}
