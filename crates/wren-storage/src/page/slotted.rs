//! Slotted page format for variable-length records.
//!
//! A slotted page stores variable-length records inside one fixed-size
//! block through an indirection layer (the slot entries). Records can be
//! added without moving existing payloads, deleted by tombstoning their
//! slot, and grown or shrunk in place with a directed compaction slide.
//!
//! # Block Layout
//!
//! ```text
//! +--------------------------+
//! |  num_records (u16 LE)    |  bytes 0..2
//! |  end_free    (u16 LE)    |  bytes 2..4
//! +--------------------------+
//! |  slot entry 1            |  bytes 4..8   (size: u16, offset: u16)
//! |  slot entry 2            |  bytes 8..12
//! |  ...                     |  entries grow downward in the header area
//! +--------------------------+
//! |  free space              |  ends at end_free (inclusive)
//! +--------------------------+
//! |  record payloads         |  grow upward from the end of the block
//! |   [record 2]             |
//! |   [record 1]             |
//! +--------------------------+
//! ```
//!
//! `end_free` is the offset of the last byte still free. A tombstoned
//! record has slot entry `(0, 0)`; its id is never reused, so handles
//! stay stable across compaction.

use tracing::trace;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{BlockId, Handle, RecordId};

/// Size of one slot entry in bytes (size: 2, offset: 2).
pub const SLOT_ENTRY_SIZE: usize = 4;

/// A slotted page view over one block's bytes.
///
/// The page owns its block buffer; [`HeapFile`](crate::heap::HeapFile)
/// materializes pages from stored bytes and writes them back whole.
#[derive(Debug, Clone)]
pub struct SlottedPage {
    block: Vec<u8>,
    id: BlockId,
    num_records: u16,
    end_free: u16,
}

impl SlottedPage {
    /// Creates a fresh, empty page for a block of the given size.
    #[must_use]
    pub fn new(id: BlockId, block_size: usize) -> Self {
        let mut page = Self {
            block: vec![0u8; block_size],
            id,
            num_records: 0,
            end_free: (block_size - 1) as u16,
        };
        page.put_block_header();
        page
    }

    /// Materializes a page from stored block bytes.
    ///
    /// Fails with [`DbError::Corruption`] if the stored header violates the
    /// layout invariants.
    pub fn from_bytes(id: BlockId, block: Vec<u8>) -> DbResult<Self> {
        if block.len() < SLOT_ENTRY_SIZE {
            return Err(DbError::corruption(format!(
                "block {} too small for slotted page header",
                id
            )));
        }
        let num_records = u16::from_le_bytes([block[0], block[1]]);
        let end_free = u16::from_le_bytes([block[2], block[3]]);
        let page = Self {
            block,
            id,
            num_records,
            end_free,
        };
        page.check_invariants()?;
        Ok(page)
    }

    /// Returns the block ID this page belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the block size.
    #[inline]
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Returns the raw block bytes for writing back to the store.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.block
    }

    /// Returns the number of allocated record slots, tombstones included.
    #[inline]
    #[must_use]
    pub fn num_records(&self) -> u16 {
        self.num_records
    }

    /// Adds a new record, returning its id.
    ///
    /// Fails with [`DbError::NoRoom`] if the payload plus a fresh slot
    /// entry does not fit in the remaining free space.
    pub fn add(&mut self, data: &[u8]) -> DbResult<RecordId> {
        let size = data.len();
        if !self.has_room_for_add(size) {
            return Err(DbError::NoRoom {
                needed: size + SLOT_ENTRY_SIZE,
                available: self.free_space(),
            });
        }
        self.num_records += 1;
        let id = self.num_records;
        self.end_free -= size as u16;
        let loc = self.end_free + 1;
        self.put_block_header();
        self.put_slot(id, size as u16, loc);
        self.block[loc as usize..loc as usize + size].copy_from_slice(data);
        Ok(RecordId::new(id))
    }

    /// Returns a record's payload, or `None` for a tombstoned slot.
    pub fn get(&self, record_id: RecordId) -> DbResult<Option<&[u8]>> {
        let (size, loc) = self.slot_checked(record_id)?;
        if loc == 0 {
            return Ok(None); // tombstone
        }
        let start = loc as usize;
        let end = start + size as usize;
        if start <= self.end_free as usize || end > self.block.len() {
            return Err(DbError::corruption(format!(
                "record {} in block {} lies outside the payload region",
                record_id, self.id
            )));
        }
        Ok(Some(&self.block[start..end]))
    }

    /// Replaces a record's payload in place, sliding neighbors as needed.
    ///
    /// Fails with [`DbError::NoRoom`] if growth does not fit.
    pub fn put(&mut self, record_id: RecordId, data: &[u8]) -> DbResult<()> {
        let (size, loc) = self.slot_checked(record_id)?;
        if loc == 0 {
            return Err(DbError::NoSuchRecord(Handle::new(self.id, record_id)));
        }
        if data.len() > u16::MAX as usize {
            return Err(DbError::NoRoom {
                needed: data.len(),
                available: self.free_space(),
            });
        }
        let new_size = data.len() as u16;
        if new_size > size {
            let extra = new_size - size;
            if extra as usize > self.free_space() {
                return Err(DbError::NoRoom {
                    needed: extra as usize,
                    available: self.free_space(),
                });
            }
            self.slide(loc, loc - extra)?;
            let start = (loc - extra) as usize;
            self.block[start..start + data.len()].copy_from_slice(data);
        } else {
            let start = loc as usize;
            self.block[start..start + data.len()].copy_from_slice(data);
            self.slide(loc + new_size, loc + size)?;
        }
        let (_, loc) = self.slot(record_id.as_u16());
        self.put_slot(record_id.as_u16(), new_size, loc);
        Ok(())
    }

    /// Tombstones a record and compacts the payload region.
    ///
    /// The record id is retained so ids of other records never change.
    pub fn del(&mut self, record_id: RecordId) -> DbResult<()> {
        let (size, loc) = self.slot_checked(record_id)?;
        if loc == 0 {
            return Ok(()); // already deleted
        }
        self.put_slot(record_id.as_u16(), 0, 0);
        self.slide(loc, loc + size)
    }

    /// Returns all non-tombstoned record ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<RecordId> {
        (1..=self.num_records)
            .filter(|&id| self.slot(id).1 != 0)
            .map(RecordId::new)
            .collect()
    }

    /// Resets the page to empty, discarding all records and their ids.
    pub fn clear(&mut self) {
        self.num_records = 0;
        self.end_free = (self.block.len() - 1) as u16;
        self.put_block_header();
    }

    /// Bytes still available between the slot entries and the payloads.
    #[must_use]
    pub fn free_space(&self) -> usize {
        (self.end_free as usize + 1)
            .saturating_sub(SLOT_ENTRY_SIZE * (self.num_records as usize + 1))
    }

    // =========================================================================
    // Layout internals
    // =========================================================================

    /// Room check for `add`: the payload and one fresh slot entry must fit.
    fn has_room_for_add(&self, size: usize) -> bool {
        SLOT_ENTRY_SIZE * (self.num_records as usize + 2) + size <= self.end_free as usize + 1
    }

    /// Slides the payload bytes in `[end_free + 1, start)` by `end - start`
    /// and fixes up every slot entry at or below `start`.
    ///
    /// A positive shift compacts upward (after delete/shrink), a negative
    /// shift opens a gap (before growth). Callers guarantee the room for a
    /// negative shift.
    fn slide(&mut self, start: u16, end: u16) -> DbResult<()> {
        let shift = end as i32 - start as i32;
        if shift == 0 {
            return Ok(());
        }
        trace!(block = %self.id, start, end, shift, "sliding page payloads");

        let data_begin = self.end_free as usize + 1;
        let start = start as usize;
        if start < data_begin || start > self.block.len() {
            return Err(DbError::corruption(format!(
                "slide start {} outside payload region of block {}",
                start, self.id
            )));
        }
        let dest = data_begin as i32 + shift;
        if dest < SLOT_ENTRY_SIZE as i32 * (self.num_records as i32 + 1) {
            return Err(DbError::corruption(format!(
                "slide would overwrite slot entries in block {}",
                self.id
            )));
        }
        self.block.copy_within(data_begin..start, dest as usize);

        for id in 1..=self.num_records {
            let (size, loc) = self.slot(id);
            if loc != 0 && (loc as usize) <= start {
                self.put_slot(id, size, (loc as i32 + shift) as u16);
            }
        }
        self.end_free = (self.end_free as i32 + shift) as u16;
        self.put_block_header();
        Ok(())
    }

    /// Reads a slot entry, verifying the record id is in range.
    fn slot_checked(&self, record_id: RecordId) -> DbResult<(u16, u16)> {
        let id = record_id.as_u16();
        if id == 0 || id > self.num_records {
            return Err(DbError::NoSuchRecord(Handle::new(self.id, record_id)));
        }
        Ok(self.slot(id))
    }

    fn slot(&self, id: u16) -> (u16, u16) {
        let size = self.get_n(SLOT_ENTRY_SIZE * id as usize);
        let loc = self.get_n(SLOT_ENTRY_SIZE * id as usize + 2);
        (size, loc)
    }

    fn put_slot(&mut self, id: u16, size: u16, loc: u16) {
        self.put_n(SLOT_ENTRY_SIZE * id as usize, size);
        self.put_n(SLOT_ENTRY_SIZE * id as usize + 2, loc);
    }

    fn put_block_header(&mut self) {
        let (num_records, end_free) = (self.num_records, self.end_free);
        self.put_n(0, num_records);
        self.put_n(2, end_free);
    }

    fn get_n(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.block[offset], self.block[offset + 1]])
    }

    fn put_n(&mut self, offset: usize, n: u16) {
        self.block[offset..offset + 2].copy_from_slice(&n.to_le_bytes());
    }

    fn check_invariants(&self) -> DbResult<()> {
        let block_size = self.block.len();
        if self.end_free as usize >= block_size {
            return Err(DbError::corruption(format!(
                "end_free {} beyond block size {} in block {}",
                self.end_free, block_size, self.id
            )));
        }
        if SLOT_ENTRY_SIZE * (self.num_records as usize + 1) > self.end_free as usize + 1 {
            return Err(DbError::corruption(format!(
                "slot entries overlap payload region in block {}",
                self.id
            )));
        }
        for id in 1..=self.num_records {
            let (size, loc) = self.slot(id);
            if loc == 0 {
                continue;
            }
            if (loc as usize) <= self.end_free as usize
                || loc as usize + size as usize > block_size
            {
                return Err(DbError::corruption(format!(
                    "record {} in block {} lies outside the payload region",
                    id, self.id
                )));
            }
        }
        Ok(())
    }
}
