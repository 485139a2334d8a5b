//! Block layout and the slotted page format.

mod slotted;

pub use slotted::{SlottedPage, SLOT_ENTRY_SIZE};
