//! Derives the control endpoint from the location of the running executable.
//!
//! The endpoint is the only artefact tether writes to disk. Its presence is
//! the signal that a supervisor may already be running, so there is no
//! separate lock or pid file to keep in sync with it.

use std::fmt;
use std::fs::{self, DirBuilder};
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::defaults::{PROC_DIR_NAME, SOCKET_FILE_NAME};

/// Filesystem address of a supervisor's control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEndpoint {
    directory: Utf8PathBuf,
    socket_path: Utf8PathBuf,
}

impl ControlEndpoint {
    /// Derives the endpoint for the executable at `executable`.
    ///
    /// The socket lives at `<parent of executable>/.proc/sock`. The path is
    /// used as given; callers are expected to pass an absolute, resolved path
    /// so that every role started from the same binary agrees on the address.
    pub fn for_executable(executable: &Path) -> Result<Self, EndpointError> {
        let executable = Utf8Path::from_path(executable).ok_or_else(|| EndpointError::NonUtf8 {
            path: executable.display().to_string(),
        })?;
        let parent = executable
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| EndpointError::MissingParent {
                path: executable.to_path_buf(),
            })?;
        Ok(Self::in_directory(parent.join(PROC_DIR_NAME)))
    }

    /// Builds an endpoint rooted at an explicit `.proc` directory.
    #[must_use]
    pub fn in_directory(directory: impl Into<Utf8PathBuf>) -> Self {
        let directory = directory.into();
        let socket_path = directory.join(SOCKET_FILE_NAME);
        Self {
            directory,
            socket_path,
        }
    }

    /// Directory containing the socket file.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Path of the socket file.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        &self.socket_path
    }

    /// Reports whether anything currently occupies the socket path.
    ///
    /// Dangling symlinks and stale socket files count as present: the caller
    /// cannot tell them apart from a live supervisor without connecting.
    #[must_use]
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(self.socket_path.as_std_path()).is_ok()
    }

    /// Ensures the endpoint directory exists with restrictive permissions.
    ///
    /// The directory is created non-recursively; the executable's own
    /// directory is assumed to exist.
    pub fn prepare_directory(&self) -> Result<(), EndpointError> {
        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        match builder.create(self.directory.as_std_path()) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(EndpointError::CreateDirectory {
                path: self.directory.clone(),
                source,
            }),
        }
    }
}

impl fmt::Display for ControlEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unix://{}", self.socket_path)
    }
}

/// Errors raised while deriving or preparing a [`ControlEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The executable path is not valid UTF-8.
    #[error("executable path '{path}' is not valid UTF-8")]
    NonUtf8 {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// The executable path has no parent directory.
    #[error("executable path '{path}' has no parent directory")]
    MissingParent {
        /// Executable path as given.
        path: Utf8PathBuf,
    },
    /// Creating the endpoint directory failed.
    #[error("failed to create control directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
