//! Error handling for WrenDB.
//!
//! All engine components share the [`DbError`] type. The only variant that
//! is routinely caught and recovered from is [`DbError::NoRoom`]: the heap
//! answers it by allocating a fresh page, the B+Tree by splitting a node.
//! Everything else propagates to the executor boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Handle;

/// Result type alias for WrenDB operations.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// The unified error type for WrenDB.
#[derive(Debug, Error)]
pub enum DbError {
    /// A slotted page cannot accept a record at the requested size.
    ///
    /// Recovered locally wherever it can occur: the heap allocates a new
    /// page, the B+Tree splits the node.
    #[error("not enough room in block: need {needed} bytes, {available} available")]
    NoRoom {
        /// Bytes the operation required.
        needed: usize,
        /// Bytes the block could still provide.
        available: usize,
    },

    /// Unique-index violation.
    #[error("duplicate keys are not allowed in unique index")]
    DuplicateKey,

    /// A referenced column does not exist in the relation.
    #[error("no such column: {0}")]
    NoSuchColumn(String),

    /// A referenced table does not exist.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// A referenced index does not exist.
    #[error("no such index: {index} on table {table}")]
    NoSuchIndex {
        /// Table the index was looked up on.
        table: String,
        /// Index name.
        index: String,
    },

    /// A referenced record does not exist (or has been deleted).
    #[error("no such record: {0}")]
    NoSuchRecord(Handle),

    /// A schema-level rule was violated (dropping a catalog table,
    /// creating a non-unique B+Tree, duplicate names, arity mismatches).
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A data type outside {INT, TEXT, BOOLEAN}.
    #[error("unsupported data type: {0}")]
    UnsupportedType(String),

    /// An on-disk layout invariant was violated. Fatal.
    #[error("corrupt block: {reason}")]
    Corruption {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Underlying block-store failure.
    #[error("block store failure on {path}: {source}")]
    Store {
        /// File the failure occurred on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Operation this engine does not implement.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An evaluation plan that cannot be evaluated.
    #[error("invalid evaluation plan: {0}")]
    InvalidPlan(&'static str),
}

impl DbError {
    /// Shorthand for a [`DbError::Corruption`].
    pub fn corruption(reason: impl Into<String>) -> Self {
        DbError::Corruption {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`DbError::Store`].
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DbError::Store {
            path: path.into(),
            source,
        }
    }

    /// True if this error is the recoverable out-of-room condition.
    #[must_use]
    pub const fn is_no_room(&self) -> bool {
        matches!(self, DbError::NoRoom { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_room_detection() {
        let err = DbError::NoRoom {
            needed: 100,
            available: 10,
        };
        assert!(err.is_no_room());
        assert!(!DbError::DuplicateKey.is_no_room());
    }

    #[test]
    fn test_messages() {
        let err = DbError::NoSuchColumn("shell".to_string());
        assert_eq!(err.to_string(), "no such column: shell");

        let err = DbError::corruption("offset beyond block");
        assert_eq!(err.to_string(), "corrupt block: offset beyond block");
    }
}
