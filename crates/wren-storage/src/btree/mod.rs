//! Disk-resident B+Tree index.
//!
//! The tree lives in its own heap file: a stat block at block 1 (root
//! pointer and height), leaf blocks holding (handle, key) pairs chained
//! left-to-right, and interior blocks routing keys to children by strictly
//! ascending boundary keys. Children are always referenced by [`BlockId`],
//! never by owning pointers.
//!
//! [`BlockId`]: wren_common::types::BlockId

mod index;
mod node;

pub use index::BTreeIndex;
