//! Heap tables: relations stored row-by-row in a heap file.

use std::path::Path;

use tracing::debug;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{ColumnAttribute, Handle, Row};

use super::codec;
use super::file::HeapFile;

/// A relation over a heap file.
///
/// Rows are marshaled in schema column order and appended to the tail
/// page; a full tail page triggers allocation of a fresh one. Deleting
/// tombstones the record within its block, keeping all handles stable.
#[derive(Debug)]
pub struct HeapTable {
    name: String,
    column_names: Vec<String>,
    column_attributes: Vec<ColumnAttribute>,
    file: HeapFile,
}

impl HeapTable {
    /// Creates a heap table handle.
    ///
    /// `column_names` and `column_attributes` are aligned positionally and
    /// define the relation's schema.
    #[must_use]
    pub fn new(
        dir: &Path,
        block_size: usize,
        name: impl Into<String>,
        column_names: Vec<String>,
        column_attributes: Vec<ColumnAttribute>,
    ) -> Self {
        let name = name.into();
        let file = HeapFile::new(dir, name.clone(), block_size);
        Self {
            name,
            column_names,
            column_attributes,
            file,
        }
    }

    /// Returns the table name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema's column names, in declaration order.
    #[inline]
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the schema's column attributes, aligned with the names.
    #[inline]
    #[must_use]
    pub fn column_attributes(&self) -> &[ColumnAttribute] {
        &self.column_attributes
    }

    /// Grants the index layer access to the underlying heap file.
    #[inline]
    pub fn file_mut(&mut self) -> &mut HeapFile {
        &mut self.file
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates the backing heap file. Fails if it already exists.
    pub fn create(&mut self) -> DbResult<()> {
        self.file.create()
    }

    /// Opens the table if the backing file exists, creates it otherwise.
    ///
    /// Returns `true` if the file was newly created.
    pub fn create_if_not_exists(&mut self) -> DbResult<bool> {
        if self.file.path().exists() {
            self.file.open()?;
            Ok(false)
        } else {
            self.create()?;
            Ok(true)
        }
    }

    /// Opens the backing file.
    pub fn open(&mut self) -> DbResult<()> {
        self.file.open()
    }

    /// Closes the backing file.
    pub fn close(&mut self) {
        self.file.close();
    }

    /// Deletes the backing file.
    pub fn drop_table(&mut self) -> DbResult<()> {
        self.file.drop_file()
    }

    // =========================================================================
    // Row operations
    // =========================================================================

    /// Inserts a row, returning its handle.
    ///
    /// The row must supply a value of the declared type for every schema
    /// column; extra keys are ignored.
    pub fn insert(&mut self, row: &Row) -> DbResult<Handle> {
        self.open()?;
        let full_row = self.validate(row)?;
        self.append(&full_row)
    }

    /// Row update by handle.
    pub fn update(&mut self, _handle: Handle, _new_values: &Row) -> DbResult<()> {
        Err(DbError::NotImplemented("UPDATE on heap tables"))
    }

    /// Deletes the row behind `handle`, leaving a tombstone.
    pub fn delete(&mut self, handle: Handle) -> DbResult<()> {
        self.open()?;
        let mut block = self.file.get(handle.block)?;
        block.del(handle.record)?;
        self.file.put(&block)
    }

    /// Handles of all live rows, in block order then record order.
    pub fn select(&mut self) -> DbResult<Vec<Handle>> {
        self.select_where(&Row::new())
    }

    /// Handles of rows matching an equality conjunction.
    ///
    /// A row qualifies when every `(column, value)` pair of `predicate` is
    /// present in the row with an equal value.
    pub fn select_where(&mut self, predicate: &Row) -> DbResult<Vec<Handle>> {
        self.open()?;
        let mut handles = Vec::new();
        for block_id in self.file.block_ids() {
            let block = self.file.get(block_id)?;
            for record_id in block.ids() {
                let handle = Handle::new(block_id, record_id);
                if self.selected(handle, predicate)? {
                    handles.push(handle);
                }
            }
        }
        Ok(handles)
    }

    /// Re-filters a previous handle list with another equality conjunction.
    pub fn select_from(&mut self, handles: &[Handle], predicate: &Row) -> DbResult<Vec<Handle>> {
        self.open()?;
        let mut selected = Vec::new();
        for &handle in handles {
            if self.selected(handle, predicate)? {
                selected.push(handle);
            }
        }
        Ok(selected)
    }

    /// Projects all columns of the row behind `handle`.
    pub fn project(&mut self, handle: Handle) -> DbResult<Row> {
        self.project_columns(handle, &[])
    }

    /// Projects the given columns of the row behind `handle`.
    ///
    /// An empty column list means all columns; an unknown column fails with
    /// [`DbError::NoSuchColumn`].
    pub fn project_columns(&mut self, handle: Handle, column_names: &[String]) -> DbResult<Row> {
        self.open()?;
        let block = self.file.get(handle.block)?;
        let data = block
            .get(handle.record)?
            .ok_or(DbError::NoSuchRecord(handle))?;
        let mut row = codec::unmarshal_row(data, &self.column_names, &self.column_attributes)?;
        if column_names.is_empty() {
            return Ok(row);
        }
        let mut result = Row::with_capacity(column_names.len());
        for name in column_names {
            let value = row
                .remove(name)
                .ok_or_else(|| DbError::NoSuchColumn(name.clone()))?;
            result.insert(name.clone(), value);
        }
        Ok(result)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Checks a row against the schema, producing the full row to store.
    fn validate(&self, row: &Row) -> DbResult<Row> {
        let mut full_row = Row::with_capacity(self.column_names.len());
        for name in &self.column_names {
            let value = row
                .get(name)
                .ok_or_else(|| DbError::NoSuchColumn(format!("{} (no value supplied)", name)))?;
            full_row.insert(name.clone(), value.clone());
        }
        Ok(full_row)
    }

    /// Appends a marshaled row to the tail page, extending the file when
    /// the tail is full.
    fn append(&mut self, row: &Row) -> DbResult<Handle> {
        let data = codec::marshal_row(row, &self.column_names, &self.column_attributes)?;
        let mut block = self.file.get(self.file.last_block_id())?;
        let record_id = match block.add(&data) {
            Ok(record_id) => record_id,
            Err(err) if err.is_no_room() => {
                debug!(table = %self.name, "tail page full, extending heap file");
                block = self.file.get_new()?;
                block.add(&data)?
            }
            Err(err) => return Err(err),
        };
        self.file.put(&block)?;
        Ok(Handle::new(block.id(), record_id))
    }

    /// True if the row behind `handle` matches every predicate pair.
    fn selected(&mut self, handle: Handle, predicate: &Row) -> DbResult<bool> {
        if predicate.is_empty() {
            return Ok(true);
        }
        let row = self.project(handle)?;
        Ok(predicate
            .iter()
            .all(|(name, value)| row.get(name) == Some(value)))
    }
}
