//! Heap storage: files of slotted pages, the row codec, and heap tables.

pub mod codec;
mod file;
mod table;

pub use file::HeapFile;
pub use table::HeapTable;
