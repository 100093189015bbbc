//! Broker configuration
//!
//! Loaded from `SCHEMABROKER_*` environment variables, or deserialized from
//! any serde source.

use std::env;

use schemabroker_backend::config::DEFAULT_PORT;
use schemabroker_backend::BackendConfig;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8080/dashboard";
const DEFAULT_ENFORCE_INTERVAL_SECS: u64 = 300;
const DEFAULT_RUST_LOG: &str = "info";

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Storage and admission limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Per-schema storage limit in MB. Unset makes `enforce()` fail.
    #[serde(default)]
    pub max_storage_mb: Option<u64>,

    /// Maximum number of instances. Unset means no admission limit.
    #[serde(default)]
    pub max_instances: Option<u64>,
}

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Shared SQL server.
    pub backend: BackendConfig,

    #[serde(default)]
    pub quota: QuotaPolicy,

    /// Base of the dashboard link returned on provision.
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    /// Seconds between scheduled quota passes. Never zero.
    #[serde(
        default = "default_enforce_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub enforcement_interval_secs: u64,

    /// Log filter directive.
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
}

fn default_dashboard_url() -> String {
    DEFAULT_DASHBOARD_URL.to_string()
}

fn default_enforce_interval() -> u64 {
    DEFAULT_ENFORCE_INTERVAL_SECS
}

fn default_rust_log() -> String {
    DEFAULT_RUST_LOG.to_string()
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom(
            "enforcement_interval_secs must be at least one second",
        ));
    }
    Ok(secs)
}

impl BrokerConfig {
    /// Config with defaults for everything but the backend.
    #[must_use]
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            quota: QuotaPolicy::default(),
            dashboard_url: default_dashboard_url(),
            enforcement_interval_secs: DEFAULT_ENFORCE_INTERVAL_SECS,
            rust_log: default_rust_log(),
        }
    }

    #[must_use]
    pub fn with_quota(mut self, quota: QuotaPolicy) -> Self {
        self.quota = quota;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a numeric
    /// value does not parse.
    ///
    /// # Required Variables
    ///
    /// - `SCHEMABROKER_DB_HOST` - Backend host as seen by bound applications
    /// - `SCHEMABROKER_DB_DSN` - Data source name
    /// - `SCHEMABROKER_DB_ADMIN_USER` - Administrative account
    ///
    /// # Optional Variables
    ///
    /// - `SCHEMABROKER_DB_PORT` - SQL port (default: 30015)
    /// - `SCHEMABROKER_DB_ADMIN_PASSWORD` - Administrative password
    /// - `SCHEMABROKER_MAX_STORAGE_MB` - Per-schema storage limit
    /// - `SCHEMABROKER_MAX_INSTANCES` - Instance admission limit
    /// - `SCHEMABROKER_DASHBOARD_URL` - Dashboard base URL
    /// - `SCHEMABROKER_ENFORCE_INTERVAL_SECS` - Quota pass interval (default: 300)
    /// - `RUST_LOG` - Log level filter (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
        };

        let host = required("SCHEMABROKER_DB_HOST")?;
        let dsn = required("SCHEMABROKER_DB_DSN")?;
        let admin_username = required("SCHEMABROKER_DB_ADMIN_USER")?;

        let port = parse_optional::<u16>(&lookup, "SCHEMABROKER_DB_PORT")?.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SCHEMABROKER_DB_PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let mut backend = BackendConfig::new(host, dsn, admin_username).with_port(port);
        if let Some(password) = lookup("SCHEMABROKER_DB_ADMIN_PASSWORD") {
            backend = backend.with_admin_password(password);
        }

        let quota = QuotaPolicy {
            max_storage_mb: parse_optional(&lookup, "SCHEMABROKER_MAX_STORAGE_MB")?,
            max_instances: parse_optional(&lookup, "SCHEMABROKER_MAX_INSTANCES")?,
        };

        let enforcement_interval_secs =
            parse_optional(&lookup, "SCHEMABROKER_ENFORCE_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_ENFORCE_INTERVAL_SECS);
        if enforcement_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SCHEMABROKER_ENFORCE_INTERVAL_SECS".to_string(),
                message: "Interval must be at least one second".to_string(),
            });
        }

        let config = Self {
            backend,
            quota,
            dashboard_url: lookup("SCHEMABROKER_DASHBOARD_URL")
                .unwrap_or_else(default_dashboard_url),
            enforcement_interval_secs,
            rust_log: lookup("RUST_LOG").unwrap_or_else(default_rust_log),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check a config built in code or loaded from a serde source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an incomplete backend or a
    /// zero enforcement interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                var: "backend".to_string(),
                message: e.message,
            })?;
        if self.enforcement_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "enforcement_interval_secs".to_string(),
                message: "Interval must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var: var.to_string(),
                message: e.to_string(),
            }),
    }
}
