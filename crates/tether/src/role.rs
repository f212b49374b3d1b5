//! Classifies the current process into one of the tether roles.
//!
//! Every role runs the same executable. The public flags (`--daemon`,
//! `--signal <op>`) are read from the argument vector; the internal
//! re-exec bookkeeping travels in the [`ROLE_ENV_VAR`] marker so the wrapped
//! application's arguments are forwarded untouched.
//!
//! The worker marker names the supervisor that spawned the worker
//! (`worker:<pid>`) and is honoured only in a direct child of that process.
//! Descendants of the worker inherit the variable but not the parent, so they
//! resolve from their own flags.

use std::ffi::{OsStr, OsString};

/// Environment variable carrying the private role marker.
pub const ROLE_ENV_VAR: &str = "TETHER_ROLE";

const SUPERVISOR_MARKER: &str = "supervisor";
const WORKER_MARKER: &str = "worker";

const DAEMON_FLAGS: [&str; 2] = ["--daemon", "-daemon"];
const SIGNAL_FLAGS: [&str; 2] = ["--signal", "-signal"];

/// Role assumed by the current process for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessRole {
    /// No tether flags or markers: run the application in the foreground.
    Standalone,
    /// One-shot client delivering `operation` to a running supervisor.
    ///
    /// The operation is kept verbatim; it is validated only after the client
    /// has connected.
    ControlClient {
        /// Operation text as given on the command line.
        operation: String,
    },
    /// One-shot launcher that starts a detached supervisor.
    Daemon,
    /// Long-running process owning the worker and the control endpoint.
    Supervisor,
    /// Process running the wrapped application under supervision.
    Worker,
}

/// Private marker applied to re-executed processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleMarker {
    Supervisor,
    Worker {
        /// Process id of the supervisor that spawned the worker.
        supervisor: u32,
    },
}

impl RoleMarker {
    /// Marker for workers spawned by the running process.
    pub(crate) fn worker_of_current_process() -> Self {
        Self::Worker {
            supervisor: std::process::id(),
        }
    }

    pub(crate) fn encode(self) -> String {
        match self {
            Self::Supervisor => SUPERVISOR_MARKER.to_owned(),
            Self::Worker { supervisor } => format!("{WORKER_MARKER}:{supervisor}"),
        }
    }

    fn parse(value: &OsStr) -> Option<Self> {
        let value = value.to_str()?;
        if value == SUPERVISOR_MARKER {
            return Some(Self::Supervisor);
        }
        let (kind, supervisor) = value.split_once(':')?;
        if kind != WORKER_MARKER {
            return None;
        }
        supervisor
            .parse()
            .ok()
            .map(|supervisor| Self::Worker { supervisor })
    }

    /// Drops worker markers that were inherited rather than set by the
    /// parent supervisor.
    fn applies_to_child_of(self, parent: u32) -> bool {
        match self {
            Self::Supervisor => true,
            Self::Worker { supervisor } => supervisor == parent,
        }
    }
}

impl ProcessRole {
    /// Resolves the role from the full argument vector (including `argv[0]`)
    /// and the value of the [`ROLE_ENV_VAR`] marker, if any.
    ///
    /// Markers take precedence over public flags, and `--daemon` takes
    /// precedence over `--signal`. Unrecognised marker values are ignored, as
    /// are worker markers naming a supervisor other than the parent process.
    #[must_use]
    pub fn resolve<S>(args: &[S], marker: Option<&OsStr>) -> Self
    where
        S: AsRef<OsStr>,
    {
        Self::resolve_for_parent(args, marker, std::os::unix::process::parent_id())
    }

    /// Like [`ProcessRole::resolve`], with the parent process id supplied.
    #[must_use]
    pub fn resolve_for_parent<S>(args: &[S], marker: Option<&OsStr>, parent: u32) -> Self
    where
        S: AsRef<OsStr>,
    {
        let marker = marker
            .and_then(RoleMarker::parse)
            .filter(|marker| marker.applies_to_child_of(parent));
        match marker {
            Some(RoleMarker::Worker { .. }) => return Self::Worker,
            Some(RoleMarker::Supervisor) => return Self::Supervisor,
            None => {}
        }

        let flags = args.iter().skip(1).map(as_os_str);
        if flags.clone().any(|arg| is_one_of(arg, &DAEMON_FLAGS)) {
            return Self::Daemon;
        }

        let mut remaining = flags;
        while let Some(arg) = remaining.next() {
            if is_one_of(arg, &SIGNAL_FLAGS) {
                let operation = remaining
                    .next()
                    .map(|value| value.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Self::ControlClient { operation };
            }
        }
        Self::Standalone
    }

    /// Resolves the role of the running process.
    #[must_use]
    pub fn detect() -> Self {
        let args: Vec<OsString> = std::env::args_os().collect();
        Self::resolve(&args, std::env::var_os(ROLE_ENV_VAR).as_deref())
    }

    /// Reports whether the application should continue into its own logic.
    #[must_use]
    pub const fn runs_application(&self) -> bool {
        matches!(self, Self::Standalone | Self::Worker)
    }
}

fn as_os_str<S: AsRef<OsStr>>(arg: &S) -> &OsStr {
    arg.as_ref()
}

fn is_one_of(arg: &OsStr, candidates: &[&str]) -> bool {
    candidates.iter().any(|candidate| arg == *candidate)
}
