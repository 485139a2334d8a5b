//! The executor-boundary error type.

use thiserror::Error;
use wren_common::error::DbError;

/// Result type for statement execution.
pub type SqlResult<T> = Result<T, SqlExecError>;

/// Error surfaced by [`Database::execute`](super::Database::execute).
///
/// Every engine error crossing the executor boundary is wrapped with an
/// explanatory message; the original [`DbError`] stays attached as the
/// source.
#[derive(Debug, Error)]
#[error("SQL execution failed: {message}")]
pub struct SqlExecError {
    message: String,
    #[source]
    source: Option<DbError>,
}

impl SqlExecError {
    /// Creates an executor error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the explanatory message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the engine error this wraps, if any.
    #[must_use]
    pub fn db_error(&self) -> Option<&DbError> {
        self.source.as_ref()
    }
}

impl From<DbError> for SqlExecError {
    fn from(source: DbError) -> Self {
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }
}
