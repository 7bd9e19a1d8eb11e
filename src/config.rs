// Application configuration loaded from the environment

use thiserror::Error;

use crate::metrics::DEFAULT_SLOW_OPERATION_THRESHOLD_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Server settings read from environment variables (and `.env`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    pub slow_operation_threshold_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_filter: "info".to_string(),
            slow_operation_threshold_ms: DEFAULT_SLOW_OPERATION_THRESHOLD_MS,
        }
    }
}

impl AppConfig {
    /// Read HOST, PORT, RUST_LOG and SLOW_OPERATION_THRESHOLD_MS
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let log_filter = lookup("RUST_LOG").unwrap_or(defaults.log_filter);

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value })?,
            None => defaults.port,
        };

        let slow_operation_threshold_ms = match lookup("SLOW_OPERATION_THRESHOLD_MS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "SLOW_OPERATION_THRESHOLD_MS",
                value,
            })?,
            None => defaults.slow_operation_threshold_ms,
        };

        Ok(Self {
            host,
            port,
            log_filter,
            slow_operation_threshold_ms,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
