//! SQL statement representation.
//!
//! These are the types the (external) SQL parser produces. The supported
//! surface is deliberately small: table and index DDL, SHOW commands,
//! single-row INSERT, DELETE, and SELECT with an optional equality
//! conjunction (`col = literal [AND col = literal]*`).

use wren_common::types::{DataType, Value};

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `CREATE TABLE t (col type, ...)`
    CreateTable(CreateTableStatement),
    /// `CREATE INDEX n ON t USING {BTREE|HASH} (col, ...)`
    CreateIndex(CreateIndexStatement),
    /// `DROP TABLE t`
    DropTable(DropTableStatement),
    /// `DROP INDEX n FROM t`
    DropIndex(DropIndexStatement),
    /// `SHOW TABLES`
    ShowTables,
    /// `SHOW COLUMNS FROM t`
    ShowColumns(ShowColumnsStatement),
    /// `SHOW INDEX FROM t`
    ShowIndex(ShowIndexStatement),
    /// `INSERT INTO t (cols) VALUES (lits)`
    Insert(InsertStatement),
    /// `DELETE FROM t WHERE ...`
    Delete(DeleteStatement),
    /// `SELECT cols|* FROM t [WHERE ...]`
    Select(SelectStatement),
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Name of the table to create.
    pub table_name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnDef>,
}

/// One column definition inside CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
}

impl ColumnDef {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Index access method named in CREATE INDEX.
///
/// Only BTREE is functional; it implies a unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    /// A unique B+Tree index.
    BTree,
    /// Hash index: recorded in the catalog, not materialized.
    Hash,
}

impl IndexMethod {
    /// Returns the catalog name of this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexMethod::BTree => "BTREE",
            IndexMethod::Hash => "HASH",
        }
    }
}

/// CREATE INDEX statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Name of the index to create.
    pub index_name: String,
    /// Table the index is on.
    pub table_name: String,
    /// Access method.
    pub method: IndexMethod,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
}

/// DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// Table to drop.
    pub table_name: String,
}

/// DROP INDEX statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropIndexStatement {
    /// Index to drop.
    pub index_name: String,
    /// Table the index is on.
    pub table_name: String,
}

/// SHOW COLUMNS FROM statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowColumnsStatement {
    /// Table whose columns to show.
    pub table_name: String,
}

/// SHOW INDEX FROM statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowIndexStatement {
    /// Table whose indexes to show.
    pub table_name: String,
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Table to insert into.
    pub table_name: String,
    /// Optional explicit column list; `None` means schema order.
    pub columns: Option<Vec<String>>,
    /// Literal values, aligned with the column list.
    pub values: Vec<Literal>,
}

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Table to delete from.
    pub table_name: String,
    /// Optional equality conjunction.
    pub selection: Option<Conjunction>,
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projected columns; `None` means `*`.
    pub columns: Option<Vec<String>>,
    /// Table to select from.
    pub table_name: String,
    /// Optional equality conjunction.
    pub selection: Option<Conjunction>,
}

/// A literal value in a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Int(i32),
    /// String literal.
    Text(String),
    /// Boolean literal.
    Bool(bool),
}

impl Literal {
    /// Converts the literal into a runtime value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Int(v) => Value::Int(*v),
            Literal::Text(v) => Value::Text(v.clone()),
            Literal::Bool(v) => Value::Boolean(*v),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        literal.to_value()
    }
}

/// An equality conjunction: `col = literal [AND col = literal]*`.
pub type Conjunction = Vec<(String, Literal)>;
