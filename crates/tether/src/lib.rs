//! Self-daemonising process supervision for command-line applications.
//!
//! An application calls [`bootstrap`] first thing in `main`. The same
//! executable then plays one of several roles:
//!
//! - `--daemon` starts a detached supervisor and exits.
//! - `--signal stop` or `--signal restart` sends a command to the running
//!   supervisor and exits.
//! - The supervisor keeps exactly one worker alive, respawning it when it
//!   dies, and listens for commands on `<executable dir>/.proc/sock`.
//! - Workers and plain invocations return from [`bootstrap`] and run the
//!   application.
//!
//! ```no_run
//! fn main() {
//!     let _role = tether::bootstrap();
//!     // application logic
//! }
//! ```
//!
//! The control protocol is one newline-terminated command per connection with
//! no reply. Exit statuses are described by [`FailureCode`].

mod bootstrap;
mod client;
mod command;
mod exit;
mod launcher;
mod role;
mod supervisor;
mod telemetry;
mod transport;
mod worker;

pub use bootstrap::{Invocation, RoleOutcome, bootstrap, run_role, run_role_with};
pub use client::ClientError;
pub use command::ControlCommand;
pub use exit::FailureCode;
pub use launcher::LaunchError;
pub use role::{ProcessRole, ROLE_ENV_VAR};
pub use supervisor::SupervisorError;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::ListenerError;
