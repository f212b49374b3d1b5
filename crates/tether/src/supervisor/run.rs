use std::sync::mpsc;

use tether_config::ControlEndpoint;
use tracing::warn;

use crate::transport::ControlListener;
use crate::worker::ProcessSpawner;

use super::SUPERVISOR_TARGET;
use super::errors::SupervisorError;
use super::event::{ControlSink, SupervisorEvent};
use super::reactor::SupervisorLoop;
use super::reporter::{LifecycleReporter, StopReason};
use super::signals::forward_termination_signals;

/// Whether OS termination signals are turned into stop events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalForwarding {
    Enabled,
    #[cfg(test)]
    Disabled,
}

/// Everything the supervisor needs to run.
#[derive(Debug)]
pub(crate) struct SupervisorPlan {
    pub(crate) endpoint: ControlEndpoint,
    pub(crate) spawner: ProcessSpawner,
    pub(crate) signals: SignalForwarding,
}

/// Runs the supervisor until it is told to stop.
///
/// The endpoint is bound before the first worker starts. On the way out the
/// worker is terminated first and the endpoint released second; only then
/// does this function return.
pub(crate) fn run_supervisor<R>(
    plan: SupervisorPlan,
    reporter: &R,
) -> Result<StopReason, SupervisorError>
where
    R: LifecycleReporter,
{
    let SupervisorPlan {
        endpoint,
        spawner,
        signals,
    } = plan;
    let listener = ControlListener::bind(&endpoint)?;
    let (events, inbox) = mpsc::channel::<SupervisorEvent>();
    let listener = listener.start(ControlSink::new(events.clone()))?;
    reporter.supervisor_started(&endpoint);

    if signals == SignalForwarding::Enabled {
        if let Err(error) = forward_termination_signals(events.clone()) {
            warn!(
                target: SUPERVISOR_TARGET,
                error = %error,
                "failed to install signal handlers; only the stop command will end the supervisor"
            );
        }
    }

    let reason = SupervisorLoop::start(spawner, events, inbox, reporter).run();

    listener.shutdown();
    if let Err(error) = listener.join() {
        warn!(
            target: SUPERVISOR_TARGET,
            error = %error,
            "control listener did not shut down cleanly"
        );
    }
    reporter.supervisor_stopped();
    Ok(reason)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::super::reporter::recording::{Recorded, RecordingReporter};
    use super::*;
    use crate::command::ControlCommand;

    struct Scratch {
        _dir: TempDir,
        endpoint: ControlEndpoint,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = TempDir::new().expect("temp dir");
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("utf-8 temp dir");
        let endpoint = ControlEndpoint::in_directory(root.join(".proc"));
        endpoint.prepare_directory().expect("prepare directory");
        Scratch {
            _dir: dir,
            endpoint,
        }
    }

    fn plan(endpoint: &ControlEndpoint) -> SupervisorPlan {
        SupervisorPlan {
            endpoint: endpoint.clone(),
            spawner: ProcessSpawner::new("sleep", vec![OsString::from("30")]),
            signals: SignalForwarding::Disabled,
        }
    }

    fn connect(endpoint: &ControlEndpoint) -> UnixStream {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match UnixStream::connect(endpoint.socket_path()) {
                Ok(stream) => return stream,
                Err(error) => {
                    assert!(Instant::now() < deadline, "endpoint never came up: {error}");
                    thread::sleep(Duration::from_millis(20));
                }
            }
        }
    }

    #[rstest]
    fn stop_releases_endpoint_after_worker(scratch: Scratch) {
        let reporter = Arc::new(RecordingReporter::default());
        let supervisor = {
            let plan = plan(&scratch.endpoint);
            let reporter = Arc::clone(&reporter);
            thread::spawn(move || run_supervisor(plan, &reporter))
        };

        let mut stream = connect(&scratch.endpoint);
        stream
            .write_all(ControlCommand::Stop.to_line().as_bytes())
            .expect("send stop");
        drop(stream);

        let reason = supervisor
            .join()
            .expect("supervisor thread")
            .expect("supervisor succeeds");
        assert_eq!(reason, StopReason::Command);
        assert!(!scratch.endpoint.exists(), "socket must be released");

        let events = reporter.events();
        assert_eq!(events.first(), Some(&Recorded::Started));
        assert_eq!(
            events[events.len() - 3..],
            [
                Recorded::Terminated(crate::worker::WorkerId::FIRST),
                Recorded::Stopping(StopReason::Command),
                Recorded::Stopped,
            ]
        );
    }

    #[rstest]
    fn logged_listener_warnings_do_not_block_stop(scratch: Scratch) {
        crate::telemetry::initialise(&tether_config::Config::default()).expect("telemetry");
        let (finished, outcome) = mpsc::channel();
        {
            let plan = plan(&scratch.endpoint);
            thread::spawn(move || {
                let reporter = RecordingReporter::default();
                finished.send(run_supervisor(plan, &reporter)).ok();
            });
        }

        let mut oversized = vec![b'x'; 2000];
        oversized.push(b'\n');
        connect(&scratch.endpoint)
            .write_all(&oversized)
            .expect("send oversized line");
        connect(&scratch.endpoint)
            .write_all(ControlCommand::Stop.to_line().as_bytes())
            .expect("send stop");

        let reason = outcome
            .recv_timeout(Duration::from_secs(10))
            .expect("supervisor stops after a logged warning")
            .expect("supervisor succeeds");
        assert_eq!(reason, StopReason::Command);
        assert!(!scratch.endpoint.exists(), "socket must be released");
    }

    #[rstest]
    fn live_endpoint_is_fatal_and_spawns_nothing(scratch: Scratch) {
        let _holder = std::os::unix::net::UnixListener::bind(scratch.endpoint.socket_path())
            .expect("occupy endpoint");
        let reporter = RecordingReporter::default();

        let result = run_supervisor(plan(&scratch.endpoint), &reporter);

        assert!(matches!(result, Err(SupervisorError::Listener { .. })));
        assert!(reporter.events().is_empty());
    }
}
