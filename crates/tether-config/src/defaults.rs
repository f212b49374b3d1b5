use crate::logging::LogFormat;

/// Name of the directory created next to the executable to hold the endpoint.
pub const PROC_DIR_NAME: &str = ".proc";

/// File name of the control socket inside [`PROC_DIR_NAME`].
pub const SOCKET_FILE_NAME: &str = "sock";

/// Environment variable holding the tracing filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "TETHER_LOG";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "TETHER_LOG_FORMAT";

/// Default log filter expression.
///
/// The wrapped application shares the terminal with the launcher and the
/// control client, so only warnings and errors are shown unless asked for.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
