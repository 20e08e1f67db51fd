//! File service: exact-match edits and windowed reads

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::types::{EditOperation, EditOutcome};
use crate::error::{Error, Result};
use crate::service::patch::{self, Patched};

/// Validated (offset, limit) pair for line reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadWindow {
    /// 0-based first line
    pub offset: usize,
    /// Max lines (None = to end of file)
    pub limit: Option<usize>,
}

impl ReadWindow {
    /// Build a window from caller supplied values, rejecting negatives
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Result<Self> {
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(Error::InvalidArgument(format!(
                "offset must be >= 0, got {}",
                offset
            )));
        }
        let limit = match limit {
            Some(l) if l < 0 => {
                return Err(Error::InvalidArgument(format!(
                    "limit must be >= 0, got {}",
                    l
                )))
            }
            Some(l) => Some(l as usize),
            None => None,
        };
        Ok(Self {
            offset: offset as usize,
            limit,
        })
    }
}

/// File service bridging the patcher to files on disk.
///
/// Every edit is a single read-modify-write: the file is read once, patched in
/// memory and written back at most once, only when the whole patch succeeded.
/// There is no cross-call locking; concurrent editors of one path race.
#[derive(Debug, Default)]
pub struct FileService;

impl FileService {
    /// Create a new file service
    pub fn new() -> Self {
        Self
    }

    /// Replace `old_string` with `new_string` in a file
    pub async fn edit(&self, path: &str, edit: &EditOperation) -> Result<EditOutcome> {
        info!(
            "Editing {} (replace_all = {})",
            path, edit.replace_all
        );

        let (target, original) = self.read_text(path).await?;
        let patched = patch::apply_one(&original, edit).map_err(|e| e.into_error(path))?;

        self.commit(path, &target, &original, patched, 1).await
    }

    /// Apply several edits in order, writing only if all of them apply
    pub async fn multi_edit(&self, path: &str, edits: &[EditOperation]) -> Result<EditOutcome> {
        info!("Applying {} edits to {}", edits.len(), path);

        if edits.is_empty() {
            return Err(Error::InvalidArgument("edits must not be empty".to_string()));
        }

        let (target, original) = self.read_text(path).await?;
        let patched = patch::apply_sequence(&original, edits).map_err(|e| e.into_error(path))?;

        self.commit(path, &target, &original, patched, edits.len()).await
    }

    /// Read the lines inside `window` (line terminators stripped)
    pub async fn read(&self, path: &str, window: ReadWindow) -> Result<Vec<String>> {
        debug!(
            "Reading {} (offset = {}, limit = {:?})",
            path, window.offset, window.limit
        );

        let (_, content) = self.read_text(path).await?;
        let lines = content
            .lines()
            .skip(window.offset)
            .take(window.limit.unwrap_or(usize::MAX))
            .map(str::to_string)
            .collect();

        Ok(lines)
    }

    /// Resolve and read a text file; returns the real path and its content
    async fn read_text(&self, path: &str) -> Result<(PathBuf, String)> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("file_path must not be empty".to_string()));
        }

        // Resolve symlinks so the atomic rename replaces the real file
        let target = match fs::canonicalize(path).await {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_string()))
            }
            Err(e) => return Err(Error::Internal(format!("Failed to resolve {}: {}", path, e))),
        };

        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| Error::Internal(format!("Failed to get metadata: {}", e)))?;
        if metadata.is_dir() {
            return Err(Error::InvalidArgument(format!("{} is a directory", path)));
        }

        let content = fs::read_to_string(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_string()),
            ErrorKind::InvalidData => {
                Error::InvalidArgument(format!("{} is not valid UTF-8 text", path))
            }
            _ => Error::Internal(format!("Failed to read file: {}", e)),
        })?;

        Ok((target, content))
    }

    async fn commit(
        &self,
        path: &str,
        target: &Path,
        original: &str,
        patched: Patched,
        edits_applied: usize,
    ) -> Result<EditOutcome> {
        write_file(target, &patched.content).await?;

        let outcome = EditOutcome {
            path: path.to_string(),
            edits_applied,
            replacements: patched.replacements,
            bytes_before: original.len(),
            bytes_after: patched.content.len(),
            bytes_changed: patched.content.len() as i64 - original.len() as i64,
        };
        info!(
            "Edited {}: {} replacement(s), {} -> {} bytes",
            path, outcome.replacements, outcome.bytes_before, outcome.bytes_after
        );
        Ok(outcome)
    }
}

/// Write `content` over `target`.
///
/// Files that can be swapped safely go through a sibling temp file and a
/// rename. Files with extra hard links or a different owner are rewritten in
/// place so the inode, its links and its ownership stay put. The same happens
/// when the directory refuses new files.
async fn write_file(target: &Path, content: &str) -> Result<()> {
    let metadata = fs::metadata(target)
        .await
        .map_err(|e| Error::Internal(format!("Failed to get metadata: {}", e)))?;

    if !replaceable(&metadata) {
        debug!("Rewriting {} in place", target.display());
        return write_in_place(target, content).await;
    }

    let dir = target
        .parent()
        .ok_or_else(|| Error::InvalidArgument(format!("{} has no parent", target.display())))?;
    let name = target
        .file_name()
        .ok_or_else(|| Error::InvalidArgument(format!("{} has no file name", target.display())))?;
    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    if let Err(e) = fs::write(&tmp, content).await {
        remove_temp(&tmp).await;
        if e.kind() == ErrorKind::PermissionDenied {
            debug!(
                "Cannot create temp file next to {}, rewriting in place",
                target.display()
            );
            return write_in_place(target, content).await;
        }
        return Err(Error::Internal(format!("Failed to write file: {}", e)));
    }

    let committed = async {
        fs::set_permissions(&tmp, metadata.permissions()).await?;
        fs::rename(&tmp, target).await
    };
    if let Err(e) = committed.await {
        remove_temp(&tmp).await;
        return Err(Error::Internal(format!("Failed to write file: {}", e)));
    }

    Ok(())
}

async fn write_in_place(target: &Path, content: &str) -> Result<()> {
    fs::write(target, content)
        .await
        .map_err(|e| Error::Internal(format!("Failed to write file: {}", e)))
}

async fn remove_temp(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove temp file {}: {}", tmp.display(), e);
        }
    }
}

/// Whether a rename can replace the file without losing links or ownership
#[cfg(unix)]
fn replaceable(metadata: &std::fs::Metadata) -> bool {
    use nix::unistd::{getegid, geteuid};
    use std::os::unix::fs::MetadataExt;

    metadata.nlink() <= 1
        && metadata.uid() == geteuid().as_raw()
        && metadata.gid() == getegid().as_raw()
}

#[cfg(not(unix))]
fn replaceable(_metadata: &std::fs::Metadata) -> bool {
    true
}
