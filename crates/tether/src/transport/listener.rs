//! Listener implementation for the supervisor's control socket.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use tether_config::ControlEndpoint;

use super::decode::{ConnectionOutcome, handle_connection};
use super::{CommandSink, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a control endpoint but not yet accepting.
#[derive(Debug)]
pub(crate) struct ControlListener {
    endpoint: ControlEndpoint,
    listener: UnixListener,
}

impl ControlListener {
    /// Binds the endpoint's socket, replacing a stale socket file.
    ///
    /// A socket file that still accepts connections belongs to a live
    /// supervisor and is never replaced.
    pub(crate) fn bind(endpoint: &ControlEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_unix(endpoint.socket_path().as_std_path())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Starts accepting connections on a background thread.
    ///
    /// Commands are delivered to `sink` in the order they are read. Once a
    /// Stop has been delivered, or the sink reports that its consumer is gone,
    /// the listener stops accepting; it releases the endpoint only when
    /// [`ListenerHandle::shutdown`] is called.
    pub(crate) fn start<S>(self, sink: S) -> Result<ListenerHandle, ListenerError>
    where
        S: CommandSink,
    {
        if let Err(source) = self.listener.set_nonblocking(true) {
            cleanup_socket(&self.endpoint);
            return Err(ListenerError::NonBlocking { source });
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let endpoint = self.endpoint.clone();
        let handle = thread::Builder::new()
            .name("tether-control".to_owned())
            .spawn(move || run_accept_loop(self, &shutdown_flag, &sink))
            .map_err(|source| {
                cleanup_socket(&endpoint);
                ListenerError::Spawn { source }
            })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the listener to stop accepting and release the endpoint.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits until the listener has closed its socket and removed the file.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop<S>(listener: ControlListener, shutdown: &AtomicBool, sink: &S)
where
    S: CommandSink,
{
    let ControlListener { endpoint, listener } = listener;
    info!(
        target: LISTENER_TARGET,
        endpoint = %endpoint,
        "control listener active"
    );
    let mut accepting = true;
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        if !accepting {
            thread::sleep(ACCEPT_BACKOFF);
            continue;
        }
        match accept_connection(&listener) {
            Ok(Some(stream)) => {
                last_error = None;
                if handle_connection(stream, sink) == ConnectionOutcome::Draining {
                    debug!(
                        target: LISTENER_TARGET,
                        "no longer accepting control connections"
                    );
                    accepting = false;
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "control socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    drop(listener);
    cleanup_socket(&endpoint);
    info!(
        target: LISTENER_TARGET,
        endpoint = %endpoint,
        "control endpoint released"
    );
}

fn accept_connection(listener: &UnixListener) -> io::Result<Option<UnixStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    let existing = match fs::symlink_metadata(path) {
        Ok(metadata) => Some(metadata),
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(ListenerError::Metadata {
                path: path.display().to_string(),
                source,
            });
        }
    };
    if let Some(metadata) = existing {
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::NotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::InUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                warn!(
                    target: LISTENER_TARGET,
                    path = %path.display(),
                    "removing stale control socket"
                );
                fs::remove_file(path).map_err(|source| ListenerError::Cleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ListenerError::LivenessCheck {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        path: path.display().to_string(),
        source,
    })
}

fn cleanup_socket(endpoint: &ControlEndpoint) {
    if let Err(error) = fs::remove_file(endpoint.socket_path().as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %endpoint.socket_path(),
            "failed to remove control socket file"
        );
    }
}
