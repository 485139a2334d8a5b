//! Engine-wide constants and limits.

/// Default size of a storage block in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Smallest block size the engine accepts.
pub const MIN_BLOCK_SIZE: usize = 512;

/// Largest block size the engine accepts (slot offsets are u16).
pub const MAX_BLOCK_SIZE: usize = 32 * 1024;

/// Maximum length of a TEXT value in bytes (u16 length framing).
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// File extension used for heap and index files.
pub const DB_FILE_EXTENSION: &str = "db";
