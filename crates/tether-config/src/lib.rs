//! Configuration shared by every tether process role.
//!
//! The launcher, supervisor, control client and worker are all the same
//! executable started with different role markers. They must agree on where
//! the control endpoint lives and how diagnostics are emitted, so those
//! decisions live here rather than in the runtime crate.
//!
//! The control endpoint is derived from the executable's own location: a
//! `.proc` directory next to the binary holding a single Unix socket named
//! `sock`. Logging settings come from the environment because the argument
//! vector belongs to the wrapped application.

mod config;
mod defaults;
mod endpoint;
mod logging;

pub use config::{Config, ConfigError, ConfigLoader, EnvConfigLoader, StaticConfigLoader};
pub use defaults::{
    DEFAULT_LOG_FILTER, LOG_FILTER_ENV_VAR, LOG_FORMAT_ENV_VAR, PROC_DIR_NAME, SOCKET_FILE_NAME,
    default_log_filter, default_log_format,
};
pub use endpoint::{ControlEndpoint, EndpointError};
pub use logging::{LogFormat, LogFormatParseError};
