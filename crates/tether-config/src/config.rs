//! Environment-backed logging configuration.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::defaults::{
    LOG_FILTER_ENV_VAR, LOG_FORMAT_ENV_VAR, default_log_filter, default_log_format,
};
use crate::logging::{LogFormat, LogFormatParseError};

/// Settings shared by the launcher, supervisor and control client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tracing filter expression, e.g. `info` or `tether=debug`.
    pub log_filter: String,
    /// Output format for structured logs.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unset or blank values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(filter) = present(LOG_FILTER_ENV_VAR) {
            config.log_filter = filter.trim().to_owned();
        }
        if let Some(format) = present(LOG_FORMAT_ENV_VAR) {
            config.log_format = LogFormat::from_str(format.trim()).map_err(|source| {
                ConfigError::LogFormat {
                    value: format.clone(),
                    source,
                }
            })?;
        }
        Ok(config)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for structured logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The log format variable held an unsupported value.
    #[error("unsupported TETHER_LOG_FORMAT value '{value}': {source}")]
    LogFormat {
        /// Raw value read from the environment.
        value: String,
        /// Parser error.
        #[source]
        source: LogFormatParseError,
    },
}

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::from_env`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfigLoader;

impl ConfigLoader for EnvConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::from_env()
    }
}

/// Loader that always yields the configuration it was built with.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps a configuration value.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}
