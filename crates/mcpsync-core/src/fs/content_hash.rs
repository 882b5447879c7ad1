//! Content hashing for change detection.
//!
//! Hashes are BLAKE3 digests of the raw bytes rendered as lowercase hex, so
//! any byte-level edit to a config file (including whitespace) is visible.

use std::path::Path;

use crate::error::SyncResult;

use super::read_optional;

/// Hash a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash a file's current contents. `Ok(None)` when the file does not exist.
pub fn hash_file(path: &Path) -> SyncResult<Option<String>> {
    Ok(read_optional(path)?.map(|bytes| hash_bytes(&bytes)))
}
