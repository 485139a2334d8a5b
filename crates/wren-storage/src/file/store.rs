//! Record-addressable block store over an ordinary file.
//!
//! A [`BlockFile`] stores fixed-length blocks keyed by [`BlockId`]. Block
//! `k` lives at byte offset `(k - 1) * block_size`; the number of stored
//! blocks is recovered from the file length on reopen.
//!
//! All I/O is synchronous: the engine's execution model is single-threaded
//! with no suspension points.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use wren_common::error::{DbError, DbResult};
use wren_common::types::BlockId;

/// A fixed-record-length block store over one OS file.
pub struct BlockFile {
    path: PathBuf,
    file: File,
    block_size: usize,
}

impl BlockFile {
    /// Creates a new block file. Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>, block_size: usize) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| DbError::store(&path, e))?;
        Ok(Self {
            path,
            file,
            block_size,
        })
    }

    /// Opens an existing block file.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| DbError::store(&path, e))?;
        Ok(Self {
            path,
            file,
            block_size,
        })
    }

    /// Returns the path this store is backed by.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured block size.
    #[inline]
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks currently stored.
    pub fn block_count(&self) -> DbResult<u32> {
        let len = self
            .file
            .metadata()
            .map_err(|e| DbError::store(&self.path, e))?
            .len();
        Ok((len / self.block_size as u64) as u32)
    }

    /// Reads the block stored under the given id.
    pub fn read_block(&mut self, id: BlockId) -> DbResult<Vec<u8>> {
        let offset = self.offset_of(id)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::store(&self.path, e))?;
        let mut buf = vec![0u8; self.block_size];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| DbError::store(&self.path, e))?;
        Ok(buf)
    }

    /// Writes a block under the given id (idempotent overwrite).
    pub fn write_block(&mut self, id: BlockId, data: &[u8]) -> DbResult<()> {
        if data.len() != self.block_size {
            return Err(DbError::corruption(format!(
                "block {} write of {} bytes into a {}-byte record store",
                id,
                data.len(),
                self.block_size
            )));
        }
        let offset = self.offset_of(id)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::store(&self.path, e))?;
        self.file
            .write_all(data)
            .map_err(|e| DbError::store(&self.path, e))?;
        Ok(())
    }

    /// Flushes all written blocks to stable storage.
    pub fn sync(&mut self) -> DbResult<()> {
        self.file
            .sync_all()
            .map_err(|e| DbError::store(&self.path, e))
    }

    /// Deletes the file behind a (closed) block store.
    pub fn remove(path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        std::fs::remove_file(path).map_err(|e| DbError::store(path, e))
    }

    fn offset_of(&self, id: BlockId) -> DbResult<u64> {
        if id.is_none() {
            return Err(DbError::corruption(
                "block id 0 addressed in block store".to_string(),
            ));
        }
        Ok((id.as_u32() as u64 - 1) * self.block_size as u64)
    }
}

impl std::fmt::Debug for BlockFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockFile")
            .field("path", &self.path)
            .field("block_size", &self.block_size)
            .finish()
    }
}
