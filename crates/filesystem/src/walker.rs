//! Directory tree walking.
//!
//! Produces the deterministic, sorted file list that upload and diff
//! planning consume. Nested files keep their relative structure in the
//! derived remote name (`docs/install.html`).

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use swiftsync_common::path_utils::remote_object_name;

use crate::error::FileSystemError;
use crate::ignore::IgnoreFilter;

/// A local file discovered during a walk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    /// The `/`-delimited remote object name this file maps to.
    pub remote_name: String,
    /// Absolute (or root-relative) local path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Walk a directory tree and return all non-ignored regular files.
///
/// Results are sorted by remote name so repeated walks over an unchanged
/// tree produce identical lists. Ignored directories are pruned without
/// descending into them.
///
/// # Arguments
/// * `root` - Directory to walk
/// * `filter` - Ignore rules applied to each entry's name
///
/// # Errors
/// Returns error if `root` is not an existing directory or an entry
/// cannot be read.
pub fn walk_files(root: &Path, filter: &IgnoreFilter) -> Result<Vec<LocalFile>, FileSystemError> {
    if !root.is_dir() {
        return Err(FileSystemError::FolderNotFound {
            path: root.display().to_string(),
        });
    }

    let mut files: Vec<LocalFile> = Vec::new();

    let walk = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry: &DirEntry| {
            // The root itself is always entered.
            if entry.depth() == 0 {
                return true;
            }
            let name: String = entry.file_name().to_string_lossy().to_string();
            !filter.is_ignored(&name)
        });

    for entry in walk {
        let entry: DirEntry = entry.map_err(|e| FileSystemError::Io {
            path: e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walk error")),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| FileSystemError::Io {
            path: entry.path().display().to_string(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("metadata error")),
        })?;

        let remote_name: String = remote_object_name(entry.path(), root)?;

        files.push(LocalFile {
            remote_name,
            path: entry.path().to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().map_err(|e| FileSystemError::Io {
                path: entry.path().display().to_string(),
                source: e,
            })?,
        });
    }

    files.sort_by(|a, b| a.remote_name.cmp(&b.remote_name));
    Ok(files)
}

/// Total size in bytes of all non-ignored files under a directory.
///
/// # Arguments
/// * `root` - Directory to measure
/// * `filter` - Ignore rules applied to each entry's name
///
/// # Errors
/// Returns error if the directory cannot be walked.
pub fn folder_size(root: &Path, filter: &IgnoreFilter) -> Result<u64, FileSystemError> {
    let files: Vec<LocalFile> = walk_files(root, filter)?;
    Ok(files.iter().map(|f| f.size).sum())
}
