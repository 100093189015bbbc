//! Broker error types

use schemabroker_backend::BackendError;
use thiserror::Error;

/// Kind of broker-managed resource named in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A tenant instance schema.
    Instance,
    /// A binding user.
    Binding,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Instance => write!(f, "instance"),
            ResourceKind::Binding => write!(f, "binding"),
        }
    }
}

/// Errors returned by broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A tenant-supplied id contains characters outside `[0-9a-zA-Z$-]`.
    #[error("invalid identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: String },

    /// The resource already exists and the operation is not idempotent.
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// The resource does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    /// A required configuration value is unset.
    #[error("configuration missing: {key}")]
    ConfigurationMissing { key: &'static str },

    /// Provisioning refused because the instance limit has been reached.
    #[error("instance limit reached: {existing} of {limit} instances exist")]
    AdmissionRejected { existing: u64, limit: u64 },

    /// Any other backend failure, propagated unchanged.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    pub(crate) fn invalid_identifier(id: &str, reason: impl Into<String>) -> Self {
        BrokerError::InvalidIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn instance_not_found(id: &str) -> Self {
        BrokerError::NotFound {
            kind: ResourceKind::Instance,
            id: id.to_string(),
        }
    }

    pub(crate) fn binding_not_found(id: &str) -> Self {
        BrokerError::NotFound {
            kind: ResourceKind::Binding,
            id: id.to_string(),
        }
    }

    /// Stable code for the HTTP layer to map onto status codes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            BrokerError::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            BrokerError::AlreadyExists { .. } => "ALREADY_EXISTS",
            BrokerError::NotFound { .. } => "NOT_FOUND",
            BrokerError::ConfigurationMissing { .. } => "CONFIGURATION_MISSING",
            BrokerError::AdmissionRejected { .. } => "ADMISSION_REJECTED",
            BrokerError::Backend(_) => "BACKEND_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server fault).
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            BrokerError::InvalidIdentifier { .. }
                | BrokerError::AlreadyExists { .. }
                | BrokerError::NotFound { .. }
                | BrokerError::AdmissionRejected { .. }
        )
    }
}
