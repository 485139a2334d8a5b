//! The self-describing schema catalog.
//!
//! Three bootstrap relations describe every relation in the database,
//! themselves included:
//!
//! - `_tables(table_name TEXT)`
//! - `_columns(table_name TEXT, column_name TEXT, data_type TEXT)`
//! - `_indices(table_name TEXT, index_name TEXT, column_name TEXT,
//!   seq_in_index INT, index_type TEXT, is_unique BOOLEAN)`
//!
//! The catalog is materialized on first access: the three heap files are
//! created if missing and seeded with the rows describing themselves. A
//! single [`Catalog`] value owns the three open relations for the life of
//! the process; there is no global state.

use std::path::{Path, PathBuf};

use tracing::debug;
use wren_common::config::DatabaseConfig;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{ColumnAttribute, DataType, Handle, Row, Value};
use wren_storage::heap::HeapTable;

/// Name of the table-of-tables relation.
pub const TABLES_TABLE_NAME: &str = "_tables";

/// Name of the column catalog relation.
pub const COLUMNS_TABLE_NAME: &str = "_columns";

/// Name of the index catalog relation.
pub const INDICES_TABLE_NAME: &str = "_indices";

/// True for the three catalog relations, which cannot be dropped.
#[must_use]
pub fn is_schema_table(name: &str) -> bool {
    name == TABLES_TABLE_NAME || name == COLUMNS_TABLE_NAME || name == INDICES_TABLE_NAME
}

/// Schemas of the catalog relations, in bootstrap order.
fn schema_table_defs() -> [(&'static str, Vec<(&'static str, DataType)>); 3] {
    [
        (TABLES_TABLE_NAME, vec![("table_name", DataType::Text)]),
        (
            COLUMNS_TABLE_NAME,
            vec![
                ("table_name", DataType::Text),
                ("column_name", DataType::Text),
                ("data_type", DataType::Text),
            ],
        ),
        (
            INDICES_TABLE_NAME,
            vec![
                ("table_name", DataType::Text),
                ("index_name", DataType::Text),
                ("column_name", DataType::Text),
                ("seq_in_index", DataType::Int),
                ("index_type", DataType::Text),
                ("is_unique", DataType::Boolean),
            ],
        ),
    ]
}

fn schema_table(dir: &Path, block_size: usize, name: &str) -> HeapTable {
    let def = schema_table_defs()
        .into_iter()
        .find(|(table, _)| *table == name)
        .map(|(_, columns)| columns)
        .unwrap_or_default();
    let (names, attrs) = def
        .into_iter()
        .map(|(column, data_type)| (column.to_string(), ColumnAttribute::new(data_type)))
        .unzip();
    HeapTable::new(dir, block_size, name, names, attrs)
}

/// A reconstructed index definition from `_indices`.
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Indexed table.
    pub table_name: String,
    /// Index name.
    pub index_name: String,
    /// Key columns, ordered by `seq_in_index`.
    pub column_names: Vec<String>,
    /// Access method name (`BTREE` or `HASH`).
    pub index_type: String,
    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

impl IndexDef {
    /// True if this definition names a materialized B+Tree.
    #[must_use]
    pub fn is_btree(&self) -> bool {
        self.index_type == "BTREE"
    }
}

/// The schema catalog: the three bootstrap relations plus the storage
/// configuration every other relation is built from.
#[derive(Debug)]
pub struct Catalog {
    data_dir: PathBuf,
    block_size: usize,
    tables: HeapTable,
    columns: HeapTable,
    indices: HeapTable,
}

impl Catalog {
    /// Opens the catalog, creating and seeding it on first use.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| DbError::store(&config.data_dir, e))?;

        let dir = config.data_dir.as_path();
        let block_size = config.block_size;
        let mut tables = schema_table(dir, block_size, TABLES_TABLE_NAME);
        let seed_tables = tables.create_if_not_exists()?;
        let mut columns = schema_table(dir, block_size, COLUMNS_TABLE_NAME);
        let seed_columns = columns.create_if_not_exists()?;
        let mut indices = schema_table(dir, block_size, INDICES_TABLE_NAME);
        indices.create_if_not_exists()?;

        let mut catalog = Self {
            data_dir: dir.to_path_buf(),
            block_size,
            tables,
            columns,
            indices,
        };
        if seed_tables || seed_columns {
            debug!(dir = %catalog.data_dir.display(), "bootstrapping schema catalog");
        }
        if seed_tables {
            for (name, _) in schema_table_defs() {
                let mut row = Row::new();
                row.insert("table_name".to_string(), Value::text(name));
                catalog.tables.insert(&row)?;
            }
        }
        if seed_columns {
            for (table, columns) in schema_table_defs() {
                for (column, data_type) in columns {
                    let mut row = Row::new();
                    row.insert("table_name".to_string(), Value::text(table));
                    row.insert("column_name".to_string(), Value::text(column));
                    row.insert("data_type".to_string(), Value::text(data_type.as_str()));
                    catalog.columns.insert(&row)?;
                }
            }
        }
        Ok(catalog)
    }

    /// Returns the directory all relation files live in.
    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the block size relations are built with.
    #[inline]
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The `_tables` relation.
    pub fn tables_mut(&mut self) -> &mut HeapTable {
        &mut self.tables
    }

    /// The `_columns` relation.
    pub fn columns_mut(&mut self) -> &mut HeapTable {
        &mut self.columns
    }

    /// The `_indices` relation.
    pub fn indices_mut(&mut self) -> &mut HeapTable {
        &mut self.indices
    }

    /// True if `_tables` has a row for the given name.
    pub fn table_exists(&mut self, name: &str) -> DbResult<bool> {
        let mut predicate = Row::new();
        predicate.insert("table_name".to_string(), Value::text(name));
        Ok(!self.tables.select_where(&predicate)?.is_empty())
    }

    /// Materializes a table handle with its schema rebuilt from `_columns`.
    ///
    /// Column order is the insertion order of the `_columns` rows.
    pub fn get_table(&mut self, name: &str) -> DbResult<HeapTable> {
        let mut predicate = Row::new();
        predicate.insert("table_name".to_string(), Value::text(name));
        let handles = self.columns.select_where(&predicate)?;
        if handles.is_empty() {
            return Err(DbError::NoSuchTable(name.to_string()));
        }
        let mut names = Vec::with_capacity(handles.len());
        let mut attrs = Vec::with_capacity(handles.len());
        for handle in handles {
            let row = self.columns.project(handle)?;
            names.push(text_field(&row, "column_name", handle)?);
            let type_name = text_field(&row, "data_type", handle)?;
            let data_type = DataType::parse(&type_name)
                .ok_or_else(|| DbError::UnsupportedType(type_name))?;
            attrs.push(ColumnAttribute::new(data_type));
        }
        Ok(HeapTable::new(
            &self.data_dir,
            self.block_size,
            name,
            names,
            attrs,
        ))
    }

    /// Reconstructs one index definition from `_indices`.
    pub fn get_index(&mut self, table_name: &str, index_name: &str) -> DbResult<IndexDef> {
        let mut predicate = Row::new();
        predicate.insert("table_name".to_string(), Value::text(table_name));
        predicate.insert("index_name".to_string(), Value::text(index_name));
        let handles = self.indices.select_where(&predicate)?;
        if handles.is_empty() {
            return Err(DbError::NoSuchIndex {
                table: table_name.to_string(),
                index: index_name.to_string(),
            });
        }
        self.index_def_from(handles)
    }

    /// All index definitions on a table, in creation order.
    pub fn indexes_for(&mut self, table_name: &str) -> DbResult<Vec<IndexDef>> {
        let mut predicate = Row::new();
        predicate.insert("table_name".to_string(), Value::text(table_name));
        let handles = self.indices.select_where(&predicate)?;

        let mut order = Vec::new();
        for handle in &handles {
            let row = self.indices.project(*handle)?;
            let name = text_field(&row, "index_name", *handle)?;
            if !order.contains(&name) {
                order.push(name);
            }
        }

        let mut defs = Vec::with_capacity(order.len());
        for name in order {
            defs.push(self.get_index(table_name, &name)?);
        }
        Ok(defs)
    }

    fn index_def_from(&mut self, handles: Vec<Handle>) -> DbResult<IndexDef> {
        let mut table_name = String::new();
        let mut index_name = String::new();
        let mut index_type = String::new();
        let mut is_unique = false;
        let mut columns: Vec<(i32, String)> = Vec::with_capacity(handles.len());
        for handle in handles {
            let row = self.indices.project(handle)?;
            table_name = text_field(&row, "table_name", handle)?;
            index_name = text_field(&row, "index_name", handle)?;
            index_type = text_field(&row, "index_type", handle)?;
            is_unique = match row.get("is_unique") {
                Some(Value::Boolean(b)) => *b,
                _ => {
                    return Err(DbError::corruption(format!(
                        "_indices row {} has no boolean is_unique",
                        handle
                    )))
                }
            };
            let seq = match row.get("seq_in_index") {
                Some(Value::Int(n)) => *n,
                _ => {
                    return Err(DbError::corruption(format!(
                        "_indices row {} has no integer seq_in_index",
                        handle
                    )))
                }
            };
            columns.push((seq, text_field(&row, "column_name", handle)?));
        }
        columns.sort_by_key(|(seq, _)| *seq);
        Ok(IndexDef {
            table_name,
            index_name,
            column_names: columns.into_iter().map(|(_, name)| name).collect(),
            index_type,
            is_unique,
        })
    }
}

fn text_field(row: &Row, column: &str, handle: Handle) -> DbResult<String> {
    match row.get(column) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(DbError::corruption(format!(
            "catalog row {} has no text {}",
            handle, column
        ))),
    }
}
