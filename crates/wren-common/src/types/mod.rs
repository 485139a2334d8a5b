//! Core types for WrenDB.
//!
//! Storage identifiers live in [`ids`], typed SQL values in [`value`].

mod ids;
mod value;

pub use ids::{BlockId, Handle, RecordId};
pub use value::{ColumnAttribute, DataType, KeyProfile, KeyValue, Row, Value};
