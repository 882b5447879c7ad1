//! Crash-safe file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{SyncError, SyncResult};

/// Read a file, returning `Ok(None)` if it does not exist.
pub fn read_optional(path: &Path) -> SyncResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SyncError::io(path, err)),
    }
}

/// Replace `path` with `data` atomically.
///
/// The bytes go to a temporary file in the target's directory, are flushed
/// to disk, and the temporary file is renamed over the target. A crash at any
/// point leaves either the old file or the new one, never a truncated mix.
/// Existing permissions are carried over on unix.
pub fn atomic_write(path: &Path, data: &[u8]) -> SyncResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SyncError::write(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| SyncError::write(parent, e))?;
    tmp.write_all(data).map_err(|e| SyncError::write(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SyncError::write(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let mode = meta.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode));
        }
    }

    tmp.persist(path)
        .map_err(|e| SyncError::write(path, e.error))?;
    Ok(())
}
