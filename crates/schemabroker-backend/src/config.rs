//! Backend connection configuration
//!
//! Connection parameters for the shared SQL server. The same values are
//! rendered into the connection strings handed out with each binding.

use serde::{Deserialize, Serialize};

use crate::error::{BackendError, BackendResult};

/// Default SQL port of a single-container HANA system (instance 00).
pub const DEFAULT_PORT: u16 = 30015;

/// Connection configuration for the shared backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Server hostname or IP address as seen by bound applications.
    pub host: String,

    /// SQL port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data source name used by the transport (e.g. an ODBC DSN).
    pub dsn: String,

    /// Administrative account used for all broker DDL.
    pub admin_username: String,

    /// Password of the administrative account. Never serialized.
    #[serde(default, skip_serializing)]
    pub admin_password: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

impl BackendConfig {
    /// Create a config with the required fields.
    pub fn new(
        host: impl Into<String>,
        dsn: impl Into<String>,
        admin_username: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            dsn: dsn.into(),
            admin_username: admin_username.into(),
            admin_password: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = Some(password.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> BackendResult<()> {
        if self.host.is_empty() {
            return Err(BackendError::new("host is required"));
        }
        if self.dsn.is_empty() {
            return Err(BackendError::new("dsn is required"));
        }
        if self.admin_username.is_empty() {
            return Err(BackendError::new("admin_username is required"));
        }
        if self.port == 0 {
            return Err(BackendError::new("port must be non-zero"));
        }
        Ok(())
    }
}
