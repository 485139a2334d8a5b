//! The B+Tree index over a heap table.

use std::path::{Path, PathBuf};

use tracing::debug;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{BlockId, Handle, KeyProfile, KeyValue, Row};

use crate::heap::{HeapFile, HeapTable};

use super::node::{BTreeStat, InteriorNode, LeafNode, Node, SplitMessage};

/// A unique ordered index stored in its own heap file.
///
/// The index file is named `<table>-<index>` and holds the stat block,
/// leaves, and interior nodes. The handle has two states, closed and open;
/// `create` and `open` leave it open, `close` and `drop_index` leave it
/// closed, and lookup/insert open it on demand.
#[derive(Debug)]
pub struct BTreeIndex {
    table_name: String,
    name: String,
    key_columns: Vec<String>,
    key_profile: KeyProfile,
    file: HeapFile,
    stat: Option<BTreeStat>,
}

impl BTreeIndex {
    /// Creates an index handle over `table` keyed by `key_columns`.
    ///
    /// The key profile is derived once from the table's schema. B+Tree
    /// indexes must be unique; a non-unique request is a schema violation.
    pub fn new(
        dir: &Path,
        block_size: usize,
        table: &HeapTable,
        name: impl Into<String>,
        key_columns: Vec<String>,
        unique: bool,
    ) -> DbResult<Self> {
        if !unique {
            return Err(DbError::SchemaViolation(
                "BTree index must have unique key".to_string(),
            ));
        }
        let name = name.into();
        let key_profile = build_key_profile(table, &key_columns)?;
        let file = HeapFile::new(
            dir,
            format!("{}-{}", table.name(), name),
            block_size,
        );
        Ok(Self {
            table_name: table.name().to_string(),
            name,
            key_columns,
            key_profile,
            file,
            stat: None,
        })
    }

    /// Returns the index name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed table's name.
    #[inline]
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the key columns, in key order.
    #[inline]
    #[must_use]
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Returns the path of the index file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Builds the index: an empty one-leaf tree, then every existing row
    /// of the relation inserted.
    pub fn create(&mut self, table: &mut HeapTable) -> DbResult<()> {
        self.file.create()?; // allocates the stat block as block 1
        let root = LeafNode::create(&mut self.file)?;
        root.save(&mut self.file, &self.key_profile)?;
        self.stat = Some(BTreeStat::create(&mut self.file, root.id())?);

        let handles = table.select()?;
        debug!(
            index = %self.name,
            table = %self.table_name,
            rows = handles.len(),
            "bulk building index"
        );
        for handle in handles {
            self.insert(table, handle)?;
        }
        Ok(())
    }

    /// Opens an existing index, enabling lookup and insert.
    pub fn open(&mut self) -> DbResult<()> {
        if self.stat.is_none() {
            self.file.open()?;
            self.stat = Some(BTreeStat::load(&mut self.file)?);
        }
        Ok(())
    }

    /// Closes the index handle.
    pub fn close(&mut self) {
        self.file.close();
        self.stat = None;
    }

    /// Deletes the index file. The handle ends up closed.
    pub fn drop_index(&mut self) -> DbResult<()> {
        self.stat = None;
        self.file.drop_file()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Indexes the row behind `handle`. The row must already exist in the
    /// relation.
    ///
    /// A leaf split propagates (new sibling, boundary) messages up the
    /// descent path; a split that reaches the root allocates a new interior
    /// root and bumps the tree height.
    pub fn insert(&mut self, table: &mut HeapTable, handle: Handle) -> DbResult<()> {
        self.open()?;
        let key_row = table.project_columns(handle, &self.key_columns)?;
        let key = self.tkey(&key_row)?;

        let (root_id, height) = self.root()?;
        if let Some(split) = self.insert_rec(root_id, height, &key, handle)? {
            let mut new_root = InteriorNode::create(&mut self.file)?;
            new_root.set_first(root_id);
            let again =
                new_root.insert_entry(&mut self.file, &self.key_profile, split.boundary, split.new_node)?;
            debug_assert!(again.is_none(), "fresh root cannot split");
            debug!(
                index = %self.name,
                root = %new_root.id(),
                height = height + 1,
                "root split"
            );
            let stat = self
                .stat
                .as_mut()
                .ok_or_else(|| DbError::corruption("index closed during insert"))?;
            stat.set_root_id(new_root.id());
            stat.set_height(height + 1);
            stat.save(&mut self.file)?;
        }
        Ok(())
    }

    /// Finds the handle stored under the given key columns.
    ///
    /// Returns at most one handle (the index is unique); an absent key
    /// yields an empty list.
    pub fn lookup(&mut self, key_row: &Row) -> DbResult<Vec<Handle>> {
        self.open()?;
        let key = self.tkey(key_row)?;
        let (mut node_id, mut height) = self.root()?;
        loop {
            match Node::load(&mut self.file, node_id, &self.key_profile, height)? {
                Node::Leaf(leaf) => return Ok(leaf.find_eq(&key).into_iter().collect()),
                Node::Interior(interior) => {
                    node_id = interior.route(&key);
                    height -= 1;
                }
            }
        }
    }

    /// Range scan between two keys.
    pub fn range(&mut self, _min_key: &Row, _max_key: &Row) -> DbResult<Vec<Handle>> {
        Err(DbError::NotImplemented("range queries on a BTree index"))
    }

    /// Removes a row from the index.
    pub fn delete(&mut self, _handle: Handle) -> DbResult<()> {
        Err(DbError::NotImplemented("deletion from a BTree index"))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn root(&self) -> DbResult<(BlockId, u32)> {
        let stat = self
            .stat
            .as_ref()
            .ok_or_else(|| DbError::corruption("index used while closed"))?;
        Ok((stat.root_id(), stat.height()))
    }

    fn insert_rec(
        &mut self,
        node_id: BlockId,
        height: u32,
        key: &KeyValue,
        handle: Handle,
    ) -> DbResult<Option<SplitMessage>> {
        match Node::load(&mut self.file, node_id, &self.key_profile, height)? {
            Node::Leaf(mut leaf) => {
                leaf.insert(&mut self.file, &self.key_profile, key.clone(), handle)
            }
            Node::Interior(mut interior) => {
                let child = interior.route(key);
                match self.insert_rec(child, height - 1, key, handle)? {
                    Some(split) => interior.insert_entry(
                        &mut self.file,
                        &self.key_profile,
                        split.boundary,
                        split.new_node,
                    ),
                    None => Ok(None),
                }
            }
        }
    }

    /// Pulls the key columns out of a projected row, in key order.
    fn tkey(&self, row: &Row) -> DbResult<KeyValue> {
        self.key_columns
            .iter()
            .map(|name| {
                row.get(name)
                    .cloned()
                    .ok_or_else(|| DbError::NoSuchColumn(name.clone()))
            })
            .collect()
    }
}

/// Matches the index's key columns against the relation's schema.
fn build_key_profile(table: &HeapTable, key_columns: &[String]) -> DbResult<KeyProfile> {
    key_columns
        .iter()
        .map(|name| {
            table
                .column_names()
                .iter()
                .position(|col| col == name)
                .map(|i| table.column_attributes()[i].data_type())
                .ok_or_else(|| DbError::NoSuchColumn(name.clone()))
        })
        .collect()
}
