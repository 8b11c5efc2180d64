//! File I/O utilities.

use crate::{DocsieveError, Result};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;

/// Read a file asynchronously.
///
/// # Errors
///
/// Returns `DocsieveError::Io` for I/O errors (these always bubble up).
pub async fn read_file_async(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(path.as_ref()).await.map_err(DocsieveError::Io)
}

/// Read a file synchronously.
pub fn read_file_sync(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    std::fs::read(path.as_ref()).map_err(DocsieveError::Io)
}

/// Validate that a path points at an existing regular file.
///
/// # Errors
///
/// Returns `DocsieveError::Validation` if the file doesn't exist or is a directory.
pub fn validate_file_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DocsieveError::validation(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if path.is_dir() {
        return Err(DocsieveError::validation(format!(
            "Path is a directory, not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Resolve a path to an absolute form without requiring it to exist.
///
/// Falls back to joining with the working directory, then to the path as given.
pub fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Async variant of [`resolve_path`].
pub async fn resolve_path_async(path: &Path) -> PathBuf {
    match fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(_) => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Size in bytes and modification time in fractional seconds since the epoch.
///
/// Returns `None` when the file can't be stat'ed.
pub fn file_fingerprint(path: &Path) -> Option<(u64, f64)> {
    fingerprint_of(&std::fs::metadata(path).ok()?)
}

/// Async variant of [`file_fingerprint`].
pub async fn file_fingerprint_async(path: &Path) -> Option<(u64, f64)> {
    fingerprint_of(&fs::metadata(path).await.ok()?)
}

fn fingerprint_of(metadata: &Metadata) -> Option<(u64, f64)> {
    let mtime = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Some((metadata.len(), mtime))
}
