//! Structured logging for the tether roles.
//!
//! Only the launcher, control client and supervisor install a subscriber.
//! Worker and standalone processes run the wrapped application, which owns
//! its own logging setup.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use tether_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Proof that the global subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Expression as configured.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] TryInitError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return immediately without inspecting `config`.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|()| TelemetryHandle)
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    tracing_subscriber::registry()
        .with(output_layer(config.log_format()))
        .with(filter)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter {
        filter: filter.to_owned(),
        message: error.to_string(),
    })
}

fn output_layer(format: LogFormat) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    match format {
        LogFormat::Json => layer.json().flatten_event(true).with_ansi(false).boxed(),
        LogFormat::Compact => layer
            .compact()
            .with_ansi(io::stderr().is_terminal())
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("tether=loud")]
    #[case("info,tether=verbose")]
    fn rejects_invalid_filter(#[case] filter: &str) {
        let error = parse_filter(filter).expect_err("filter should not parse");
        assert!(matches!(error, TelemetryError::Filter { .. }));
        assert!(error.to_string().contains(filter));
    }

    #[rstest]
    #[case("warn")]
    #[case("tether=debug,info")]
    fn accepts_directives(#[case] filter: &str) {
        assert!(parse_filter(filter).is_ok());
    }
}
