//! The supervisor role: one worker, one control endpoint, one event loop.
//!
//! The [`reactor`] owns all supervisor state and handles exactly one event per
//! iteration. The control listener and the worker monitors only ever send
//! events; they never read or write the state directly.

mod errors;
mod event;
mod reactor;
mod reporter;
mod run;
mod signals;

pub use errors::SupervisorError;
pub(crate) use reporter::StructuredLifecycleReporter;
pub(crate) use run::{SignalForwarding, SupervisorPlan, run_supervisor};

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");
