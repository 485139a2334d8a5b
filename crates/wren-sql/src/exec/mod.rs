//! The SQL statement executor.
//!
//! [`Database`] owns the schema catalog (lazily initialized on the first
//! `execute`) and dispatches parsed statements against it. Engine errors
//! crossing the boundary become [`SqlExecError`]s with explanatory
//! messages.

mod error;
mod result;

pub use error::{SqlExecError, SqlResult};
pub use result::QueryResult;

use tracing::debug;
use wren_common::config::DatabaseConfig;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{ColumnAttribute, DataType, Row, Value};
use wren_storage::btree::BTreeIndex;
use wren_storage::heap::HeapTable;

use crate::ast::{
    Conjunction, CreateIndexStatement, CreateTableStatement, DropIndexStatement,
    DropTableStatement, IndexMethod, InsertStatement, SelectStatement, ShowColumnsStatement,
    ShowIndexStatement, Statement,
};
use crate::catalog::{is_schema_table, Catalog};
use crate::plan::EvalPlan;

/// A database: configuration plus the process-wide catalog handles.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    catalog: Option<Catalog>,
}

impl Database {
    /// Creates a database over the given configuration.
    ///
    /// Nothing touches disk until the first `execute`.
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            catalog: None,
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Executes one parsed statement.
    pub fn execute(&mut self, statement: &Statement) -> SqlResult<QueryResult> {
        let catalog = self.catalog()?;
        let result = match statement {
            Statement::CreateTable(stmt) => create_table(catalog, stmt),
            Statement::CreateIndex(stmt) => create_index(catalog, stmt),
            Statement::DropTable(stmt) => drop_table(catalog, stmt),
            Statement::DropIndex(stmt) => drop_index(catalog, stmt),
            Statement::ShowTables => show_tables(catalog),
            Statement::ShowColumns(stmt) => show_columns(catalog, stmt),
            Statement::ShowIndex(stmt) => show_index(catalog, stmt),
            Statement::Insert(stmt) => insert(catalog, stmt),
            Statement::Delete(_) => Err(DbError::NotImplemented("DELETE statements")),
            Statement::Select(stmt) => select(catalog, stmt),
        };
        result.map_err(SqlExecError::from)
    }

    fn catalog(&mut self) -> SqlResult<&mut Catalog> {
        if self.catalog.is_none() {
            self.config
                .validate()
                .map_err(SqlExecError::new)?;
            self.catalog = Some(Catalog::open(&self.config)?);
        }
        Ok(self
            .catalog
            .as_mut()
            .expect("catalog initialized just above"))
    }
}

// =============================================================================
// DDL
// =============================================================================

fn create_table(catalog: &mut Catalog, stmt: &CreateTableStatement) -> DbResult<QueryResult> {
    if is_schema_table(&stmt.table_name) {
        return Err(DbError::SchemaViolation(format!(
            "cannot create schema table {}",
            stmt.table_name
        )));
    }
    if stmt.columns.is_empty() {
        return Err(DbError::SchemaViolation(
            "a table needs at least one column".to_string(),
        ));
    }
    if catalog.table_exists(&stmt.table_name)? {
        return Err(DbError::SchemaViolation(format!(
            "table {} already exists",
            stmt.table_name
        )));
    }
    debug!(table = %stmt.table_name, columns = stmt.columns.len(), "creating table");

    let mut row = Row::new();
    row.insert("table_name".to_string(), Value::text(&stmt.table_name));
    let table_row = catalog.tables_mut().insert(&row)?;

    // catalog writes and the file create compensate as a unit on failure
    let mut column_rows = Vec::with_capacity(stmt.columns.len());
    let mut failure = None;
    for def in &stmt.columns {
        let mut row = Row::new();
        row.insert("table_name".to_string(), Value::text(&stmt.table_name));
        row.insert("column_name".to_string(), Value::text(&def.name));
        row.insert(
            "data_type".to_string(),
            Value::text(def.data_type.as_str()),
        );
        match catalog.columns_mut().insert(&row) {
            Ok(handle) => column_rows.push(handle),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    if failure.is_none() {
        let names = stmt.columns.iter().map(|def| def.name.clone()).collect();
        let attrs = stmt
            .columns
            .iter()
            .map(|def| ColumnAttribute::new(def.data_type))
            .collect();
        let mut table = HeapTable::new(
            catalog.data_dir(),
            catalog.block_size(),
            &stmt.table_name,
            names,
            attrs,
        );
        if let Err(err) = table.create() {
            failure = Some(err);
        }
    }
    if let Some(err) = failure {
        // best-effort compensation; secondary failures are swallowed
        for handle in column_rows {
            let _ = catalog.columns_mut().delete(handle);
        }
        let _ = catalog.tables_mut().delete(table_row);
        return Err(err);
    }
    Ok(QueryResult::with_message(format!(
        "created {}",
        stmt.table_name
    )))
}

fn create_index(catalog: &mut Catalog, stmt: &CreateIndexStatement) -> DbResult<QueryResult> {
    let mut table = catalog.get_table(&stmt.table_name)?;
    for column in &stmt.columns {
        if !table.column_names().contains(column) {
            return Err(DbError::NoSuchColumn(column.clone()));
        }
    }
    if catalog.get_index(&stmt.table_name, &stmt.index_name).is_ok() {
        return Err(DbError::SchemaViolation(format!(
            "index {} on {} already exists",
            stmt.index_name, stmt.table_name
        )));
    }
    debug!(
        index = %stmt.index_name,
        table = %stmt.table_name,
        method = stmt.method.as_str(),
        "creating index"
    );

    let is_unique = stmt.method == IndexMethod::BTree;
    for (position, column) in stmt.columns.iter().enumerate() {
        let mut row = Row::new();
        row.insert("table_name".to_string(), Value::text(&stmt.table_name));
        row.insert("index_name".to_string(), Value::text(&stmt.index_name));
        row.insert("column_name".to_string(), Value::text(column));
        row.insert(
            "seq_in_index".to_string(),
            Value::int(position as i32 + 1),
        );
        row.insert(
            "index_type".to_string(),
            Value::text(stmt.method.as_str()),
        );
        row.insert("is_unique".to_string(), Value::boolean(is_unique));
        catalog.indices_mut().insert(&row)?;
    }

    // only BTREE indexes are materialized on disk
    if stmt.method == IndexMethod::BTree {
        let mut index = BTreeIndex::new(
            catalog.data_dir(),
            catalog.block_size(),
            &table,
            &stmt.index_name,
            stmt.columns.clone(),
            true,
        )?;
        index.create(&mut table)?;
    }
    Ok(QueryResult::with_message(format!(
        "created index {}",
        stmt.index_name
    )))
}

fn drop_table(catalog: &mut Catalog, stmt: &DropTableStatement) -> DbResult<QueryResult> {
    if is_schema_table(&stmt.table_name) {
        return Err(DbError::SchemaViolation(format!(
            "cannot drop schema table {}",
            stmt.table_name
        )));
    }
    let mut table = catalog.get_table(&stmt.table_name)?;
    debug!(table = %stmt.table_name, "dropping table");

    // index files, then index metadata
    for def in catalog.indexes_for(&stmt.table_name)? {
        if def.is_btree() {
            let mut index = BTreeIndex::new(
                catalog.data_dir(),
                catalog.block_size(),
                &table,
                &def.index_name,
                def.column_names.clone(),
                true,
            )?;
            index.drop_index()?;
        }
    }
    let mut predicate = Row::new();
    predicate.insert("table_name".to_string(), Value::text(&stmt.table_name));
    for handle in catalog.indices_mut().select_where(&predicate)? {
        catalog.indices_mut().delete(handle)?;
    }

    // column metadata, the heap file, and finally the _tables row
    for handle in catalog.columns_mut().select_where(&predicate)? {
        catalog.columns_mut().delete(handle)?;
    }
    table.drop_table()?;
    for handle in catalog.tables_mut().select_where(&predicate)? {
        catalog.tables_mut().delete(handle)?;
    }
    Ok(QueryResult::with_message(format!(
        "dropped {}",
        stmt.table_name
    )))
}

fn drop_index(catalog: &mut Catalog, stmt: &DropIndexStatement) -> DbResult<QueryResult> {
    let def = catalog.get_index(&stmt.table_name, &stmt.index_name)?;
    if def.is_btree() {
        let table = catalog.get_table(&stmt.table_name)?;
        let mut index = BTreeIndex::new(
            catalog.data_dir(),
            catalog.block_size(),
            &table,
            &def.index_name,
            def.column_names.clone(),
            true,
        )?;
        index.drop_index()?;
    }
    let mut predicate = Row::new();
    predicate.insert("table_name".to_string(), Value::text(&stmt.table_name));
    predicate.insert("index_name".to_string(), Value::text(&stmt.index_name));
    for handle in catalog.indices_mut().select_where(&predicate)? {
        catalog.indices_mut().delete(handle)?;
    }
    Ok(QueryResult::with_message(format!(
        "dropped index {}",
        stmt.index_name
    )))
}

// =============================================================================
// SHOW
// =============================================================================

fn show_tables(catalog: &mut Catalog) -> DbResult<QueryResult> {
    let column_names = vec!["table_name".to_string()];
    let column_attributes = vec![ColumnAttribute::new(DataType::Text)];

    let handles = catalog.tables_mut().select()?;
    let mut rows = Vec::new();
    for handle in handles {
        let row = catalog.tables_mut().project(handle)?;
        let hidden = matches!(
            row.get("table_name"),
            Some(Value::Text(name)) if is_schema_table(name)
        );
        if !hidden {
            rows.push(row);
        }
    }
    let message = format!("successfully returned {} rows", rows.len());
    Ok(QueryResult::with_rows(
        column_names,
        column_attributes,
        rows,
        message,
    ))
}

fn show_columns(catalog: &mut Catalog, stmt: &ShowColumnsStatement) -> DbResult<QueryResult> {
    let column_names: Vec<String> = ["table_name", "column_name", "data_type"]
        .into_iter()
        .map(String::from)
        .collect();
    let column_attributes = vec![ColumnAttribute::new(DataType::Text); 3];

    let mut predicate = Row::new();
    predicate.insert("table_name".to_string(), Value::text(&stmt.table_name));
    let handles = catalog.columns_mut().select_where(&predicate)?;
    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        rows.push(catalog.columns_mut().project(handle)?);
    }
    let message = format!("successfully returned {} rows", rows.len());
    Ok(QueryResult::with_rows(
        column_names,
        column_attributes,
        rows,
        message,
    ))
}

fn show_index(catalog: &mut Catalog, stmt: &ShowIndexStatement) -> DbResult<QueryResult> {
    let column_names: Vec<String> = [
        "table_name",
        "index_name",
        "column_name",
        "seq_in_index",
        "index_type",
        "is_unique",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let column_attributes = vec![
        ColumnAttribute::new(DataType::Text),
        ColumnAttribute::new(DataType::Text),
        ColumnAttribute::new(DataType::Text),
        ColumnAttribute::new(DataType::Int),
        ColumnAttribute::new(DataType::Text),
        ColumnAttribute::new(DataType::Boolean),
    ];

    let mut predicate = Row::new();
    predicate.insert("table_name".to_string(), Value::text(&stmt.table_name));
    let handles = catalog.indices_mut().select_where(&predicate)?;
    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        rows.push(catalog.indices_mut().project(handle)?);
    }
    let message = format!("successfully returned {} rows", rows.len());
    Ok(QueryResult::with_rows(
        column_names,
        column_attributes,
        rows,
        message,
    ))
}

// =============================================================================
// DML
// =============================================================================

fn insert(catalog: &mut Catalog, stmt: &InsertStatement) -> DbResult<QueryResult> {
    let mut table = catalog.get_table(&stmt.table_name)?;
    let column_names: Vec<String> = match &stmt.columns {
        Some(columns) => columns.clone(),
        None => table.column_names().to_vec(),
    };
    if column_names.len() != stmt.values.len() {
        return Err(DbError::SchemaViolation(format!(
            "{} columns but {} values",
            column_names.len(),
            stmt.values.len()
        )));
    }
    let mut row = Row::new();
    for (name, literal) in column_names.iter().zip(&stmt.values) {
        row.insert(name.clone(), literal.to_value());
    }
    let handle = table.insert(&row)?;

    // keep every materialized index in step with the relation
    let mut indexed = 0;
    for def in catalog.indexes_for(&stmt.table_name)? {
        if def.is_btree() {
            let mut index = BTreeIndex::new(
                catalog.data_dir(),
                catalog.block_size(),
                &table,
                &def.index_name,
                def.column_names.clone(),
                true,
            )?;
            index.insert(&mut table, handle)?;
            indexed += 1;
        }
    }
    let message = if indexed > 0 {
        format!(
            "successfully inserted 1 row into {} and {} indices",
            stmt.table_name, indexed
        )
    } else {
        format!("successfully inserted 1 row into {}", stmt.table_name)
    };
    Ok(QueryResult::with_message(message))
}

fn select(catalog: &mut Catalog, stmt: &SelectStatement) -> DbResult<QueryResult> {
    let table = catalog.get_table(&stmt.table_name)?;

    // resolve the projection and predicate against the schema up front
    let (column_names, column_attributes) = projected_schema(&table, stmt.columns.as_deref())?;
    let conjunction = match &stmt.selection {
        Some(selection) => conjunction_row(&table, selection)?,
        None => Row::new(),
    };

    let mut plan = EvalPlan::TableScan(table);
    if !conjunction.is_empty() {
        plan = EvalPlan::Select {
            conjunction,
            source: Box::new(plan),
        };
    }
    plan = match &stmt.columns {
        Some(columns) => EvalPlan::Project {
            column_names: columns.clone(),
            source: Box::new(plan),
        },
        None => EvalPlan::ProjectAll {
            source: Box::new(plan),
        },
    };
    let mut plan = plan.optimize();
    let rows = plan.evaluate()?;

    let message = format!("successfully returned {} rows", rows.len());
    Ok(QueryResult::with_rows(
        column_names,
        column_attributes,
        rows,
        message,
    ))
}

/// Resolves a projection list (or `*`) to names plus attributes.
fn projected_schema(
    table: &HeapTable,
    columns: Option<&[String]>,
) -> DbResult<(Vec<String>, Vec<ColumnAttribute>)> {
    match columns {
        None => Ok((
            table.column_names().to_vec(),
            table.column_attributes().to_vec(),
        )),
        Some(columns) => {
            let mut attrs = Vec::with_capacity(columns.len());
            for name in columns {
                let position = table
                    .column_names()
                    .iter()
                    .position(|col| col == name)
                    .ok_or_else(|| DbError::NoSuchColumn(name.clone()))?;
                attrs.push(table.column_attributes()[position]);
            }
            Ok((columns.to_vec(), attrs))
        }
    }
}

/// Turns an equality conjunction into a predicate row, checking columns.
fn conjunction_row(table: &HeapTable, selection: &Conjunction) -> DbResult<Row> {
    let mut predicate = Row::new();
    for (name, literal) in selection {
        if !table.column_names().contains(name) {
            return Err(DbError::NoSuchColumn(name.clone()));
        }
        predicate.insert(name.clone(), literal.to_value());
    }
    Ok(predicate)
}
