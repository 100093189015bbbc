//! Backend error type
//!
//! Errors surfaced by the SQL transport. The broker never inspects driver
//! specific types; it only sees the message text and, when the driver
//! reports one, the numeric error code.

use thiserror::Error;

/// Error raised by a [`SqlSession`](crate::session::SqlSession) or
/// [`SessionFactory`](crate::session::SessionFactory).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    /// Message text as reported by the backend.
    pub message: String,

    /// Vendor error code, when the transport exposes one.
    pub code: Option<i32>,

    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// Create an error from a backend message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Create an error carrying a vendor error code.
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
            source: None,
        }
    }

    /// Wrap a driver error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Case-insensitive check for a fragment of the backend message.
    ///
    /// Idempotent operations use this to recognise "already in the desired
    /// state" answers. Keep the fragments narrow.
    #[must_use]
    pub fn message_contains(&self, fragment: &str) -> bool {
        self.message
            .to_ascii_lowercase()
            .contains(&fragment.to_ascii_lowercase())
    }

    /// Error for a result set that does not have the expected shape.
    pub fn unexpected_result(sql_kind: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(format!("unexpected result for {sql_kind}: {detail}"))
    }
}
