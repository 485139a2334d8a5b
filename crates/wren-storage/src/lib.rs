//! # wren-storage
//!
//! Block-oriented storage for WrenDB.
//!
//! This crate implements the persistent storage primitives:
//! - Slotted pages: variable-length records in fixed-size blocks
//! - A record-addressable block store over ordinary files
//! - Heap files and heap tables (base relation storage)
//! - A disk-resident B+Tree index with leaf chaining and recursive splits

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Block layout and the slotted page format
pub mod page;

/// Keyed fixed-length block I/O
pub mod file;

/// Heap files, the row codec, and heap tables
pub mod heap;

/// B+Tree index
pub mod btree;
