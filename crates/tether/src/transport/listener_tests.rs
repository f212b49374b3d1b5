//! Tests for the control listener.

use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use tether_config::ControlEndpoint;

use super::{ControlListener, ListenerError, RecordingSink};
use crate::command::ControlCommand;

struct EndpointFixture {
    _dir: TempDir,
    endpoint: ControlEndpoint,
}

#[fixture]
fn endpoint() -> EndpointFixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let proc_dir =
        Utf8PathBuf::from_path_buf(dir.path().join(".proc")).expect("temp dir is valid UTF-8");
    let endpoint = ControlEndpoint::in_directory(proc_dir);
    endpoint.prepare_directory().expect("prepare directory");
    EndpointFixture {
        _dir: dir,
        endpoint,
    }
}

fn send(endpoint: &ControlEndpoint, payload: &[u8]) {
    let mut stream = UnixStream::connect(endpoint.socket_path()).expect("connect to listener");
    stream.write_all(payload).expect("write payload");
}

fn wait_for_commands(sink: &RecordingSink, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if sink.commands().len() >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn forwards_commands_from_sequential_connections(endpoint: EndpointFixture) {
    let endpoint = endpoint.endpoint;
    let listener = ControlListener::bind(&endpoint).expect("bind listener");
    let sink = RecordingSink::default();
    let handle = listener.start(sink.clone()).expect("start listener");

    send(&endpoint, b"restart\n");
    send(&endpoint, b"bogus\n");
    send(&endpoint, b"restart\n");

    assert!(wait_for_commands(&sink, 2), "expected two restarts");
    assert_eq!(
        sink.commands(),
        vec![ControlCommand::Restart, ControlCommand::Restart]
    );
    assert!(endpoint.exists(), "endpoint stays bound while serving");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!endpoint.exists(), "listener removes the socket on shutdown");
}

#[rstest]
fn keeps_endpoint_until_shutdown_after_stop(endpoint: EndpointFixture) {
    let endpoint = endpoint.endpoint;
    let listener = ControlListener::bind(&endpoint).expect("bind listener");
    let sink = RecordingSink::default();
    let handle = listener.start(sink.clone()).expect("start listener");

    send(&endpoint, b"stop\n");
    assert!(wait_for_commands(&sink, 1), "expected the stop command");
    std::thread::sleep(Duration::from_millis(100));
    assert!(
        endpoint.exists(),
        "socket file is only released on shutdown"
    );

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!endpoint.exists());
    assert_eq!(sink.commands(), vec![ControlCommand::Stop]);
}

#[rstest]
fn replaces_stale_socket_files(endpoint: EndpointFixture) {
    let endpoint = endpoint.endpoint;
    {
        let _stale = UnixListener::bind(endpoint.socket_path()).expect("bind stale listener");
    }
    assert!(endpoint.exists(), "stale socket should remain");

    let listener = ControlListener::bind(&endpoint).expect("bind over stale socket");
    let handle = listener
        .start(RecordingSink::default())
        .expect("start listener");
    UnixStream::connect(endpoint.socket_path()).expect("connect to fresh listener");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!endpoint.exists());
}

#[rstest]
fn rejects_socket_in_use(endpoint: EndpointFixture) {
    let endpoint = endpoint.endpoint;
    let _existing = UnixListener::bind(endpoint.socket_path()).expect("bind existing listener");

    let error = ControlListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(error, ListenerError::InUse { .. }));
}

#[rstest]
fn rejects_regular_file_at_socket_path(endpoint: EndpointFixture) {
    let endpoint = endpoint.endpoint;
    std::fs::write(endpoint.socket_path(), b"not a socket").expect("write file");

    let error = ControlListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(error, ListenerError::NotSocket { .. }));
}

#[test]
fn reports_bind_failure_for_missing_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let proc_dir = Utf8PathBuf::from_path_buf(dir.path().join("absent").join(".proc"))
        .expect("temp dir is valid UTF-8");
    let endpoint = ControlEndpoint::in_directory(proc_dir);

    let error = ControlListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(error, ListenerError::Bind { .. }));
}
