//! File system seams used by the engine.
//!
//! - [`FileStat`] supplies modification times (mocked in tests).
//! - [`TreeWalker`] enumerates tracked files under a festival root, pruning
//!   dot directories, the default ignore list, and configured glob patterns.
//! - [`list_dir`] lists a single directory in name order for the
//!   hierarchical walk.

use crate::classify;
use crate::config::{default_ignore_dirs, FestConfig};
use crate::error::{FestError, Result};
use chrono::{DateTime, Utc};
use globset::GlobSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

// ============================================================================
// Modification Times
// ============================================================================

/// Source of file modification times.
pub trait FileStat {
    /// Last modification time, or `None` if the file cannot be stat'ed.
    fn modified(&self, path: &Path) -> Option<DateTime<Utc>>;
}

/// [`FileStat`] backed by the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStat;

impl FileStat for DiskStat {
    fn modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }
}

// ============================================================================
// Directory Listing
// ============================================================================

/// A direct child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// List the direct children of `dir`, sorted by file name.
pub fn list_dir(dir: &Path) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.file_type().is_dir(),
            path: entry.into_path(),
        });
    }
    Ok(entries)
}

fn walk_error(dir: &Path, err: walkdir::Error) -> FestError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    match err.into_io_error() {
        Some(io) => FestError::io(path, io),
        None => FestError::io(path, std::io::Error::other("file system loop")),
    }
}

// ============================================================================
// Tracked File Walk
// ============================================================================

/// Recursive walker over a festival's tracked files.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    ignore: GlobSet,
}

impl TreeWalker {
    /// Create a walker rooted at `root`, honoring the config's ignore patterns.
    pub fn new(root: &Path, config: &FestConfig) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            ignore: config.ignore_set()?,
        })
    }

    /// Festival root this walker was created for.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All tracked files beneath the root, sorted by path.
    #[must_use]
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.tracked_files_in(&self.root)
    }

    /// Tracked files beneath `dir`, which should lie under the root, sorted
    /// by path.
    ///
    /// Unreadable subtrees are skipped rather than failing the walk.
    #[must_use]
    pub fn tracked_files_in(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_ignored(entry.path(), entry.file_type().is_dir())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| classify::is_tracked(&entry.file_name().to_string_lossy()))
            .map(DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    /// Whether `path` is pruned: a dot or default-ignored directory, or
    /// anything matching a configured ignore pattern.
    #[must_use]
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        if is_dir && (name.starts_with('.') || default_ignore_dirs().contains(&name.as_ref())) {
            return true;
        }
        path.strip_prefix(&self.root)
            .is_ok_and(|rel| self.ignore.is_match(rel))
    }
}
