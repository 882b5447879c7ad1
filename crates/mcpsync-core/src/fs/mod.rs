//! Filesystem primitives shared across features.

pub mod atomic;
pub mod content_hash;

pub use atomic::{atomic_write, read_optional};
pub use content_hash::{hash_bytes, hash_file};
