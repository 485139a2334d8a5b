//! # wren-common
//!
//! Common types, errors, and configuration for WrenDB.
//!
//! This crate provides the foundational types shared by all WrenDB
//! components:
//!
//! - **Types**: storage identifiers (`BlockId`, `RecordId`, `Handle`) and
//!   typed SQL values (`DataType`, `Value`, `Row`, `KeyValue`)
//! - **Errors**: unified error handling with `DbError`
//! - **Config**: database configuration structures
//! - **Constants**: engine-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use wren_common::types::{BlockId, Handle, RecordId, Value};
//! use wren_common::error::DbResult;
//!
//! fn example() -> DbResult<()> {
//!     let handle = Handle::new(BlockId::new(1), RecordId::new(1));
//!     let value = Value::int(42);
//!     assert_eq!(value.to_string(), "42");
//!     assert_eq!(handle.to_string(), "(1, 1)");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::DatabaseConfig;
pub use constants::*;
pub use error::{DbError, DbResult};
pub use types::{
    BlockId, ColumnAttribute, DataType, Handle, KeyProfile, KeyValue, RecordId, Row, Value,
};
