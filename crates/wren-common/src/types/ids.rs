//! Storage identifier types for WrenDB.
//!
//! These types provide type-safe wrappers around the numeric identifiers
//! used by the storage layer, preventing accidental misuse of different
//! ID kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block identifier - names a block within one storage file.
///
/// Blocks are numbered from 1; `0` is reserved as the "no such block"
/// sentinel (used, for example, as the end of the B+Tree leaf chain).
///
/// # Example
///
/// ```rust
/// use wren_common::types::BlockId;
///
/// let block = BlockId::new(42);
/// assert_eq!(block.as_u32(), 42);
/// assert!(!block.is_none());
/// assert!(BlockId::NONE.is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// The "no such block" sentinel.
    pub const NONE: Self = Self(0);

    /// First valid block ID.
    pub const FIRST: Self = Self(1);

    /// Creates a new `BlockId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next block ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is the sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    /// Creates a BlockId from bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Converts to bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            write!(f, "BlockId(NONE)")
        } else {
            write!(f, "BlockId({})", self.0)
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BlockId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<BlockId> for u32 {
    #[inline]
    fn from(id: BlockId) -> Self {
        id.0
    }
}

/// Record identifier - names a record within one block.
///
/// Records are numbered from 1 within their block; slot `0` holds the block
/// header and doubles as the tombstone sentinel in slot entries. Record IDs
/// are never reused or renumbered after a delete.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RecordId(u16);

impl RecordId {
    /// The block-header slot (also the tombstone sentinel).
    pub const HEADER: Self = Self(0);

    /// First valid record ID.
    pub const FIRST: Self = Self(1);

    /// Creates a new `RecordId` from a raw u16 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the next record ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Creates a RecordId from bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    /// Converts to bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for RecordId {
    #[inline]
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

impl From<RecordId> for u16 {
    #[inline]
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// A stable row locator: (block, record) within one relation.
///
/// Handles remain valid across in-block compaction because record IDs are
/// never renumbered; a deleted record leaves a tombstone behind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    /// Block containing the row.
    pub block: BlockId,
    /// Record slot within the block.
    pub record: RecordId,
}

impl Handle {
    /// Creates a new handle.
    #[inline]
    #[must_use]
    pub const fn new(block: BlockId, record: RecordId) -> Self {
        Self { block, record }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}, {})", self.block, self.record)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block, self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id() {
        let block = BlockId::new(42);
        assert_eq!(block.as_u32(), 42);
        assert!(!block.is_none());
        assert!(BlockId::NONE.is_none());

        let next = block.next();
        assert_eq!(next.as_u32(), 43);

        let bytes = block.to_le_bytes();
        assert_eq!(BlockId::from_le_bytes(bytes), block);
    }

    #[test]
    fn test_record_id() {
        let record = RecordId::new(7);
        assert_eq!(record.as_u16(), 7);
        assert_eq!(record.next().as_u16(), 8);
        assert_eq!(RecordId::HEADER.as_u16(), 0);

        let bytes = record.to_le_bytes();
        assert_eq!(RecordId::from_le_bytes(bytes), record);
    }

    #[test]
    fn test_handle_ordering() {
        let a = Handle::new(BlockId::new(1), RecordId::new(2));
        let b = Handle::new(BlockId::new(1), RecordId::new(3));
        let c = Handle::new(BlockId::new(2), RecordId::new(1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_display() {
        assert_eq!(BlockId::new(5).to_string(), "5");
        assert_eq!(
            Handle::new(BlockId::new(5), RecordId::new(9)).to_string(),
            "(5, 9)"
        );
    }
}
