//! Entry point wiring role resolution to the role implementations.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use tether_config::{ConfigError, ConfigLoader, ControlEndpoint, EndpointError, EnvConfigLoader};
use thiserror::Error;

use crate::client::send_command;
use crate::exit::FailureCode;
use crate::launcher::{DetachedSpawner, launch};
use crate::role::ProcessRole;
use crate::supervisor::{
    SignalForwarding, StructuredLifecycleReporter, SupervisorPlan, run_supervisor,
};
use crate::telemetry::{self, TelemetryError};
use crate::worker::ProcessSpawner;

/// Executable path and argument vector of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    executable: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    /// Builds an invocation from an executable and its full argument vector,
    /// `argv[0]` included.
    pub fn new(executable: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            executable: executable.into(),
            args,
        }
    }

    /// Describes the running process.
    ///
    /// # Errors
    ///
    /// Fails when the path of the running executable cannot be determined.
    pub fn current() -> io::Result<Self> {
        Ok(Self::new(env::current_exe()?, env::args_os().collect()))
    }

    /// Path of the executable re-run for the supervisor and its workers.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments forwarded verbatim to re-executed processes.
    #[must_use]
    pub fn forwarded_args(&self) -> &[OsString] {
        self.args.get(1..).unwrap_or_default()
    }
}

/// What the caller should do once [`run_role`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    /// Continue into the wrapped application.
    RunApplication,
    /// The role completed; exit successfully.
    Finished,
    /// The role failed; exit with the given code.
    Failed(FailureCode),
}

#[derive(Debug, Error)]
enum SetupError {
    #[error("failed to locate the running executable: {0}")]
    Executable(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Resolves the role of the running process and carries it out.
///
/// Launcher, control client and supervisor roles run to completion and the
/// process exits with the role's status. Worker and standalone roles are
/// returned so `main` can continue into the application.
#[must_use]
pub fn bootstrap() -> ProcessRole {
    let role = ProcessRole::detect();
    if role.runs_application() {
        return role;
    }
    match carry_out(&role, Invocation::current(), &EnvConfigLoader) {
        RoleOutcome::RunApplication => role,
        RoleOutcome::Finished => process::exit(0),
        RoleOutcome::Failed(code) => process::exit(code.into()),
    }
}

/// Runs a non-application role with diagnostics on the process's stderr.
///
/// The stderr handle stays unlocked: the supervisor role blocks here for its
/// whole lifetime while its threads log to the same stream.
fn carry_out<L>(role: &ProcessRole, invocation: io::Result<Invocation>, loader: &L) -> RoleOutcome
where
    L: ConfigLoader + ?Sized,
{
    let mut stderr = io::stderr();
    match invocation {
        Ok(invocation) => run_role_with(role, &invocation, loader, &mut stderr),
        Err(source) => report(&mut stderr, &SetupError::Executable(source), failure_code(role)),
    }
}

/// Carries out `role` using configuration from the environment.
///
/// Diagnostics for failures are written to `stderr`. This never exits the
/// process.
pub fn run_role<W>(role: &ProcessRole, invocation: &Invocation, stderr: &mut W) -> RoleOutcome
where
    W: Write,
{
    run_role_with(role, invocation, &EnvConfigLoader, stderr)
}

/// Carries out `role` using configuration from `loader`.
pub fn run_role_with<L, W>(
    role: &ProcessRole,
    invocation: &Invocation,
    loader: &L,
    stderr: &mut W,
) -> RoleOutcome
where
    L: ConfigLoader + ?Sized,
    W: Write,
{
    if role.runs_application() {
        return RoleOutcome::RunApplication;
    }
    let code = failure_code(role);
    let endpoint = match prepare(invocation, loader) {
        Ok(endpoint) => endpoint,
        Err(error) => return report(stderr, &error, code),
    };

    let result = match role {
        ProcessRole::Daemon => launch(
            &endpoint,
            invocation.executable(),
            invocation.forwarded_args(),
            &DetachedSpawner,
        )
        .map(drop)
        .map_err(|error| (error.exit_code(), error.to_string())),
        ProcessRole::ControlClient { operation } => send_command(&endpoint, operation)
            .map(drop)
            .map_err(|error| (error.exit_code(), error.to_string())),
        ProcessRole::Supervisor => {
            let plan = SupervisorPlan {
                endpoint,
                spawner: ProcessSpawner::for_worker(
                    invocation.executable(),
                    invocation.forwarded_args().to_vec(),
                ),
                signals: SignalForwarding::Enabled,
            };
            run_supervisor(plan, &StructuredLifecycleReporter)
                .map(drop)
                .map_err(|error| (FailureCode::Supervisor, error.to_string()))
        }
        ProcessRole::Standalone | ProcessRole::Worker => return RoleOutcome::RunApplication,
    };

    match result {
        Ok(()) => RoleOutcome::Finished,
        Err((code, message)) => report(stderr, &message, code),
    }
}

fn prepare<L>(invocation: &Invocation, loader: &L) -> Result<ControlEndpoint, SetupError>
where
    L: ConfigLoader + ?Sized,
{
    let config = loader.load()?;
    telemetry::initialise(&config)?;
    ControlEndpoint::for_executable(invocation.executable()).map_err(SetupError::from)
}

const fn failure_code(role: &ProcessRole) -> FailureCode {
    match role {
        ProcessRole::ControlClient { .. } => FailureCode::ControlClient,
        ProcessRole::Supervisor => FailureCode::Supervisor,
        ProcessRole::Daemon | ProcessRole::Standalone | ProcessRole::Worker => FailureCode::Daemon,
    }
}

fn report<W, E>(stderr: &mut W, error: &E, code: FailureCode) -> RoleOutcome
where
    W: Write,
    E: std::fmt::Display + ?Sized,
{
    // Nothing useful can be done when stderr itself is gone.
    writeln!(stderr, "error: {error}").ok();
    RoleOutcome::Failed(code)
}
