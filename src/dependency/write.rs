//! File-update strategy shared by every writer of the pipeline.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::core::{DepgenError, DepgenResult};
use crate::utils::atomic_write_async;

/// Outcome of a single file update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// New content equals the old content
    Unchanged,
    /// The file was rewritten
    Updated,
    /// The file differs but the strategy did not write it
    WouldUpdate,
}

impl FileStatus {
    /// Whether the file content differs from the desired content.
    pub fn is_change(self) -> bool {
        self != Self::Unchanged
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
            Self::WouldUpdate => "would update",
        })
    }
}

/// Whether changed files are written or only reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Write changed files atomically
    #[default]
    Apply,
    /// Never touch the disk
    DryRun,
}

impl WriteStrategy {
    /// Decide whether to write `new` over `old` at `path`.
    pub async fn update(self, path: &Path, old: &str, new: &str) -> DepgenResult<FileStatus> {
        if old == new {
            return Ok(FileStatus::Unchanged);
        }

        match self {
            Self::DryRun => {
                tracing::debug!(target: "dependency", "Would update {}", path.display());
                Ok(FileStatus::WouldUpdate)
            }
            Self::Apply => {
                atomic_write_async(path.to_path_buf(), new.to_string()).await.map_err(|e| {
                    DepgenError::FileSystemError {
                        operation: format!("write failed: {e:#}"),
                        path: path.display().to_string(),
                    }
                })?;
                tracing::debug!(target: "dependency", "Updated {}", path.display());
                Ok(FileStatus::Updated)
            }
        }
    }
}
