//! Heap files: an ordered sequence of slotted pages over a block store.
//!
//! A heap file owns `last`, the highest allocated block id. Block ids run
//! contiguously from 1 to `last` and are never recycled; pages are created
//! lazily and never freed.

use std::path::{Path, PathBuf};

use tracing::debug;
use wren_common::constants::DB_FILE_EXTENSION;
use wren_common::error::{DbError, DbResult};
use wren_common::types::BlockId;

use crate::file::BlockFile;
use crate::page::SlottedPage;

/// A sequence of fixed-size slotted pages persisted through a [`BlockFile`].
#[derive(Debug)]
pub struct HeapFile {
    name: String,
    path: PathBuf,
    block_size: usize,
    store: Option<BlockFile>,
    last: BlockId,
}

impl HeapFile {
    /// Creates a heap file handle for `<dir>/<name>.db`.
    ///
    /// The handle starts closed; `create` or `open` attach it to disk.
    #[must_use]
    pub fn new(dir: &Path, name: impl Into<String>, block_size: usize) -> Self {
        let name = name.into();
        let path = dir.join(format!("{}.{}", name, DB_FILE_EXTENSION));
        Self {
            name,
            path,
            block_size,
            store: None,
            last: BlockId::NONE,
        }
    }

    /// Returns the relation-level name of this file.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the on-disk path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the block size this file was configured with.
    #[inline]
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the highest allocated block id.
    #[inline]
    #[must_use]
    pub fn last_block_id(&self) -> BlockId {
        self.last
    }

    /// Creates the physical file. Fails if it already exists.
    ///
    /// One empty page is allocated immediately, so `last >= 1` for every
    /// created heap file.
    pub fn create(&mut self) -> DbResult<()> {
        debug!(file = %self.name, path = %self.path.display(), "creating heap file");
        self.store = Some(BlockFile::create(&self.path, self.block_size)?);
        self.last = BlockId::NONE;
        self.get_new()?;
        Ok(())
    }

    /// Opens the physical file, recovering `last` from the block count.
    pub fn open(&mut self) -> DbResult<()> {
        if self.store.is_some() {
            return Ok(());
        }
        let store = BlockFile::open(&self.path, self.block_size)?;
        self.last = BlockId::new(store.block_count()?);
        self.store = Some(store);
        Ok(())
    }

    /// Closes the file handle. The heap can be reopened later.
    pub fn close(&mut self) {
        self.store = None;
    }

    /// Deletes the physical file.
    pub fn drop_file(&mut self) -> DbResult<()> {
        debug!(file = %self.name, "dropping heap file");
        self.close();
        BlockFile::remove(&self.path)?;
        self.last = BlockId::NONE;
        Ok(())
    }

    /// Allocates a fresh empty page at the end of the file.
    pub fn get_new(&mut self) -> DbResult<SlottedPage> {
        self.open()?;
        self.last = self.last.next();
        let page = SlottedPage::new(self.last, self.block_size);
        let store = self.store_mut()?;
        store.write_block(page.id(), page.as_bytes())?;
        debug!(file = %self.name, block = %page.id(), "allocated heap page");
        Ok(page)
    }

    /// Materializes the slotted page stored under `block_id`.
    pub fn get(&mut self, block_id: BlockId) -> DbResult<SlottedPage> {
        self.open()?;
        if block_id.is_none() || block_id > self.last {
            return Err(DbError::corruption(format!(
                "block {} out of range in heap file {} (last = {})",
                block_id, self.name, self.last
            )));
        }
        let bytes = self.store_mut()?.read_block(block_id)?;
        SlottedPage::from_bytes(block_id, bytes)
    }

    /// Writes a page back to the file.
    pub fn put(&mut self, page: &SlottedPage) -> DbResult<()> {
        self.open()?;
        self.store_mut()?.write_block(page.id(), page.as_bytes())
    }

    /// All block ids in this file, in order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<BlockId> {
        (1..=self.last.as_u32()).map(BlockId::new).collect()
    }

    fn store_mut(&mut self) -> DbResult<&mut BlockFile> {
        self.store.as_mut().ok_or_else(|| {
            DbError::store(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "heap file not open"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLOCK_SIZE: usize = 4096;

    #[test]
    fn test_create_allocates_first_page() {
        let dir = TempDir::new().unwrap();
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.create().unwrap();
        assert_eq!(file.last_block_id(), BlockId::new(1));
        assert_eq!(file.block_ids(), vec![BlockId::new(1)]);

        let page = file.get(BlockId::new(1)).unwrap();
        assert!(page.ids().is_empty());
    }

    #[test]
    fn test_get_new_extends() {
        let dir = TempDir::new().unwrap();
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.create().unwrap();
        let page = file.get_new().unwrap();
        assert_eq!(page.id(), BlockId::new(2));
        assert_eq!(file.block_ids().len(), 2);
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.create().unwrap();

        let mut page = file.get(BlockId::new(1)).unwrap();
        let id = page.add(b"payload").unwrap();
        file.put(&page).unwrap();

        let page = file.get(BlockId::new(1)).unwrap();
        assert_eq!(page.get(id).unwrap(), Some(&b"payload"[..]));
    }

    #[test]
    fn test_reopen_recovers_last() {
        let dir = TempDir::new().unwrap();
        {
            let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
            file.create().unwrap();
            file.get_new().unwrap();
            file.get_new().unwrap();
            file.close();
        }
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.open().unwrap();
        assert_eq!(file.last_block_id(), BlockId::new(3));
    }

    #[test]
    fn test_drop_file() {
        let dir = TempDir::new().unwrap();
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.create().unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        file.drop_file().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_out_of_range_block() {
        let dir = TempDir::new().unwrap();
        let mut file = HeapFile::new(dir.path(), "t", BLOCK_SIZE);
        file.create().unwrap();
        assert!(matches!(
            file.get(BlockId::new(9)),
            Err(DbError::Corruption { .. })
        ));
    }
}
