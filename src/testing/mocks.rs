//! Mock implementations for testing.
//!
//! Test doubles for the file-system seams of the progress engine.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fs::FileStat;

// ============================================================================
// Mock File Stat
// ============================================================================

/// [`FileStat`] that serves modification times from a table.
///
/// Paths not in the table report no modification time, as an unreadable
/// file would.
#[derive(Debug, Clone, Default)]
pub struct MockFileStat {
    mtimes: HashMap<PathBuf, DateTime<Utc>>,
}

impl MockFileStat {
    /// Create a mock with no known files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the modification time reported for `path`.
    #[must_use]
    pub fn with_mtime(mut self, path: impl AsRef<Path>, modified: DateTime<Utc>) -> Self {
        self.mtimes.insert(path.as_ref().to_path_buf(), modified);
        self
    }

    /// Number of paths with a configured time.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }
}

impl FileStat for MockFileStat {
    fn modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        self.mtimes.get(path).copied()
    }
}
