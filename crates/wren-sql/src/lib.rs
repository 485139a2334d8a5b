//! # wren-sql
//!
//! The SQL layer of WrenDB: parser-facing AST types, the self-describing
//! schema catalog, evaluation plans, and the statement executor.
//!
//! The SQL parser itself is an external collaborator; it hands this crate
//! a [`Statement`](ast::Statement), and [`Database::execute`] runs it
//! against the storage engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Parser-facing AST types
pub mod ast;

/// Schema catalog relations
pub mod catalog;

/// Statement execution
pub mod exec;

/// Evaluation plans
pub mod plan;

pub use catalog::Catalog;
pub use exec::{Database, QueryResult, SqlExecError, SqlResult};
pub use plan::EvalPlan;
