//! Relocator: moves files into the library and prunes what they leave behind
//!
//! Moves never overwrite: an existing destination is a collision and the source
//! stays where it is. A rename is tried first; across filesystems the file is
//! copied to a `.partial` sibling, size-checked, renamed into place and only
//! then is the source deleted.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibraryLayout;
use crate::error::{RelocationError, RelocationResult};

/// Moves files and removes emptied directories below the library root
#[derive(Debug, Clone)]
pub struct Relocator {
    layout: LibraryLayout,
    protected: Vec<PathBuf>,
}

impl Relocator {
    pub fn new(layout: LibraryLayout) -> Self {
        let protected = layout.category_roots();
        Self { layout, protected }
    }

    /// Move `original` to `destination` and prune the directories it leaves empty.
    ///
    /// Returns the path the file now lives at. Equal paths are a no-op.
    pub async fn relocate(&self, original: &Path, destination: &Path) -> RelocationResult<PathBuf> {
        if original == destination {
            debug!(path = %original.display(), "Already at destination");
            return Ok(original.to_path_buf());
        }

        if !is_file(original).await {
            return Err(RelocationError::SourceMissing(original.to_path_buf()));
        }
        if exists(destination).await {
            return Err(RelocationError::PathCollision(destination.to_path_buf()));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| RelocationError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        move_file(original, destination).await?;
        info!(
            from = %original.display(),
            to = %destination.display(),
            "Moved file into library"
        );

        if let Some(parent) = original.parent() {
            let removed = self.prune_empty_dirs(parent).await;
            if removed > 0 {
                debug!(start = %parent.display(), removed, "Pruned empty directories");
            }
        }

        Ok(destination.to_path_buf())
    }

    /// Remove empty directories below and above `start`.
    ///
    /// Only directories strictly inside the library root are touched, and the
    /// category folders are never removed. Returns how many were removed.
    pub async fn prune_empty_dirs(&self, start: &Path) -> usize {
        if !self.is_prunable(start) {
            return 0;
        }

        let mut removed = 0;

        // Children first, so a parent is judged after its subfolders are gone
        let below: Vec<PathBuf> = WalkDir::new(start)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();
        for dir in below {
            if self.remove_if_empty(&dir).await {
                removed += 1;
            }
        }

        let mut current = Some(start);
        while let Some(dir) = current {
            if !self.is_prunable(dir) || !self.remove_if_empty(dir).await {
                break;
            }
            removed += 1;
            current = dir.parent();
        }

        removed
    }

    fn is_prunable(&self, dir: &Path) -> bool {
        self.layout.contains(dir) && !self.protected.iter().any(|p| p == dir)
    }

    async fn remove_if_empty(&self, dir: &Path) -> bool {
        if !is_dir_empty(dir).await {
            return false;
        }
        match fs::remove_dir(dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Removed empty directory");
                true
            }
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to remove empty directory");
                false
            }
        }
    }
}

/// Move a file without ever replacing one that already exists.
///
/// The destination is reserved with an exclusive create, so a file that shows
/// up after the collision check is still detected. The rename (or the copy
/// fallback) then only ever replaces that empty placeholder.
async fn move_file(from: &Path, to: &Path) -> RelocationResult<()> {
    reserve(from, to).await?;
    let result = transfer(from, to).await;
    if result.is_err() {
        let _ = fs::remove_file(to).await;
    }
    result
}

async fn reserve(from: &Path, to: &Path) -> RelocationResult<()> {
    match fs::OpenOptions::new().write(true).create_new(true).open(to).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(RelocationError::PathCollision(to.to_path_buf()))
        }
        Err(source) => Err(RelocationError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }),
    }
}

/// Rename, or copy-verify-rename-delete when a plain rename is not possible.
async fn transfer(from: &Path, to: &Path) -> RelocationResult<()> {
    let rename_err = match fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!(
        from = %from.display(),
        to = %to.display(),
        error = %rename_err,
        "Rename failed, falling back to copy"
    );

    let partial = partial_path(to);
    let move_err = |source| RelocationError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let expected = fs::metadata(from).await.map_err(move_err)?.len();
    if let Err(e) = fs::copy(from, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(move_err(e));
    }

    let actual = fs::metadata(&partial).await.map(|m| m.len()).unwrap_or(0);
    if actual != expected {
        let _ = fs::remove_file(&partial).await;
        return Err(RelocationError::CopyVerification {
            path: to.to_path_buf(),
            expected,
            actual,
        });
    }

    if let Err(e) = fs::rename(&partial, to).await {
        let _ = fs::remove_file(&partial).await;
        return Err(move_err(e));
    }

    // The copy is in place; a leftover source is a duplicate, not a loss
    if let Err(e) = fs::remove_file(from).await {
        warn!(path = %from.display(), error = %e, "Copied file but could not delete the source");
    }
    Ok(())
}

fn partial_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!("{}.partial", name))
}

async fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// A missing or unreadable directory counts as not empty
async fn is_dir_empty(path: &Path) -> bool {
    match fs::read_dir(path).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => false,
    }
}
