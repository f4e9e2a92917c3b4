//! File system helpers.
//!
//! Writes go through a temp file in the same directory followed by a rename.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::{DepgenError, DepgenResult};

/// Atomically replace `path` with `content`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Async wrapper around [`atomic_write`] running on the blocking pool.
pub async fn atomic_write_async(path: PathBuf, content: String) -> Result<()> {
    tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
        .await
        .context("Write task panicked")?
}

/// Read a file if it exists; `None` when it does not.
pub async fn read_optional(path: &Path) -> DepgenResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DepgenError::FileSystemError {
            operation: format!("read failed: {e}"),
            path: path.display().to_string(),
        }),
    }
}
