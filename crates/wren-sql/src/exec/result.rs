//! Query results.

use std::fmt;

use wren_common::types::{ColumnAttribute, Row, Value};

/// The result of executing one statement.
///
/// Row-producing statements carry column names, column attributes, and
/// rows; DDL statements carry only a message.
#[derive(Debug)]
pub struct QueryResult {
    column_names: Option<Vec<String>>,
    column_attributes: Option<Vec<ColumnAttribute>>,
    rows: Option<Vec<Row>>,
    message: String,
}

impl QueryResult {
    /// A result carrying only a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            column_names: None,
            column_attributes: None,
            rows: None,
            message: message.into(),
        }
    }

    /// A result carrying rows.
    pub fn with_rows(
        column_names: Vec<String>,
        column_attributes: Vec<ColumnAttribute>,
        rows: Vec<Row>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            column_names: Some(column_names),
            column_attributes: Some(column_attributes),
            rows: Some(rows),
            message: message.into(),
        }
    }

    /// Returns the column names, if the statement produced rows.
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.column_names.as_deref()
    }

    /// Returns the column attributes, if the statement produced rows.
    #[must_use]
    pub fn column_attributes(&self) -> Option<&[ColumnAttribute]> {
        self.column_attributes.as_deref()
    }

    /// Returns the result rows, if the statement produced any.
    #[must_use]
    pub fn rows(&self) -> Option<&[Row]> {
        self.rows.as_deref()
    }

    /// Returns the result message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(column_names), Some(rows)) = (&self.column_names, &self.rows) {
            for name in column_names {
                write!(f, "{} ", name)?;
            }
            writeln!(f)?;
            write!(f, "+")?;
            for _ in column_names {
                write!(f, "----------+")?;
            }
            writeln!(f)?;
            for row in rows {
                for name in column_names {
                    match row.get(name) {
                        Some(Value::Text(s)) => write!(f, "\"{}\" ", s)?,
                        Some(value) => write!(f, "{} ", value)?,
                        None => write!(f, "??? ")?,
                    }
                }
                writeln!(f)?;
            }
        }
        f.write_str(&self.message)
    }
}
