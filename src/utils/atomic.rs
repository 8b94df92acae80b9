//! Crash-safe file replacement
//!
//! Content goes to a `.tmp` staging file next to the target, is synced, and
//! only then renamed over the target. Readers see the old file or the new
//! one, never a mix.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub type AtomicResult<T> = Result<T, AtomicError>;

#[derive(Debug, thiserror::Error)]
pub enum AtomicError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn at(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> AtomicError {
    let path = path.to_path_buf();
    move |source| AtomicError::Io {
        action,
        path,
        source,
    }
}

/// Staging file used while `target` is being replaced
pub fn staging_path(target: &Path) -> PathBuf {
    target.with_extension("tmp")
}

/// Replace `path` with `content`
pub fn atomic_write<P: AsRef<Path>>(path: P, content: impl AsRef<[u8]>) -> AtomicResult<()> {
    atomic_replace(path.as_ref(), content.as_ref(), None)
}

/// Replace `target` with `content`, optionally moving the current file to
/// `backup` first
///
/// When a backup is requested and the process dies between the two renames,
/// the target is missing but the backup holds the previous content.
pub fn atomic_replace(target: &Path, content: &[u8], backup: Option<&Path>) -> AtomicResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(at("create directory", parent))?;
    }

    let staged = staging_path(target);
    {
        let mut file = File::create(&staged).map_err(at("create", &staged))?;
        file.write_all(content).map_err(at("write", &staged))?;
        file.sync_all().map_err(at("sync", &staged))?;
    }

    if let Some(backup) = backup {
        if target.exists() {
            fs::rename(target, backup).map_err(at("back up", target))?;
        }
    }

    fs::rename(&staged, target).map_err(at("rename into place", target))
}

/// Delete staging files an interrupted replacement left in `dir`
pub fn remove_staging_files<P: AsRef<Path>>(dir: P) -> AtomicResult<usize> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(at("list", dir))? {
        let path = entry.map_err(at("list", dir))?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            fs::remove_file(&path).map_err(at("remove", &path))?;
            tracing::debug!(path = %path.display(), "removed stale staging file");
            removed += 1;
        }
    }

    Ok(removed)
}
