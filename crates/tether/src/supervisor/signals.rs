use std::io;
use std::sync::mpsc::Sender;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;

use super::SUPERVISOR_TARGET;
use super::event::SupervisorEvent;

/// Turns termination signals into stop events for the supervisor loop.
///
/// The forwarding thread lives until the loop stops listening; it is not
/// joined because the process exits right after the loop does.
pub(super) fn forward_termination_signals(events: Sender<SupervisorEvent>) -> io::Result<()> {
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
    thread::Builder::new()
        .name("tether-signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                info!(
                    target: SUPERVISOR_TARGET,
                    signal,
                    "termination signal received"
                );
                if events.send(SupervisorEvent::Signal { signal }).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}
