//! Persistent per-festival progress store.
//!
//! Records are keyed by canonical task ID (a forward-slash path relative to
//! the festival root). Lookups go through two tiers:
//!
//! 1. **Canonical**: the full relative path.
//! 2. **Legacy**: the bare file name, used by stores written before canonical
//!    IDs existed.
//!
//! Legacy hits are logged, and the manager re-keys a legacy record under its
//! canonical ID the next time it writes that task. Once a festival has no
//! legacy keys left the tier can be disabled with `legacyKeyLookup: false`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::record::TaskProgress;
use crate::error::{FestError, Result};

/// Current on-disk format version.
pub const STORE_VERSION: u32 = 1;

/// Which lookup tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTier {
    Canonical,
    /// Matched under the bare file name
    Legacy,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    tasks: BTreeMap<String, TaskProgress>,
}

fn default_version() -> u32 {
    STORE_VERSION
}

/// Legacy key for a canonical ID: its final path component.
#[must_use]
pub fn legacy_key(task_id: &str) -> &str {
    task_id.rsplit('/').next().unwrap_or(task_id)
}

/// In-memory view of a festival's progress file.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    tasks: BTreeMap<String, TaskProgress>,
    legacy_lookup: bool,
}

impl ProgressStore {
    /// Create an empty store that will save to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tasks: BTreeMap::new(),
            legacy_lookup: true,
        }
    }

    /// Enable or disable the legacy key tier.
    #[must_use]
    pub fn with_legacy_lookup(mut self, enabled: bool) -> Self {
        self.legacy_lookup = enabled;
        self
    }

    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store. Unreadable or malformed files
    /// are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no progress store yet");
                return Ok(Self::new(path));
            }
            Err(e) => return Err(FestError::io(path, e)),
        };

        let document: StoreDocument =
            serde_json::from_str(&json).map_err(|e| FestError::parse(path, e.to_string()))?;
        if document.version > STORE_VERSION {
            return Err(FestError::parse(
                path,
                format!(
                    "store version {} is newer than supported version {}",
                    document.version, STORE_VERSION
                ),
            ));
        }

        let tasks = document
            .tasks
            .into_iter()
            .map(|(id, mut record)| {
                record.task_id.clone_from(&id);
                (id, record)
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            tasks,
            legacy_lookup: true,
        })
    }

    /// Write the store back to its path.
    ///
    /// Creates parent directories if needed and replaces the file atomically
    /// via a sibling temp file. There is no inter-process locking: two
    /// processes saving the same store race and the last rename wins.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| FestError::io(parent, e))?;
            }
        }

        let document = StoreDocument {
            version: STORE_VERSION,
            tasks: self.tasks.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| FestError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| FestError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), tasks = self.tasks.len(), "saved progress store");
        Ok(())
    }

    /// Path this store loads from and saves to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a record, trying the canonical key first and then the legacy key.
    #[must_use]
    pub fn get_task_progress(&self, task_id: &str) -> Option<(&TaskProgress, KeyTier)> {
        if let Some(record) = self.tasks.get(task_id) {
            return Some((record, KeyTier::Canonical));
        }
        if !self.legacy_lookup {
            return None;
        }
        let legacy = legacy_key(task_id);
        if legacy == task_id {
            return None;
        }
        let record = self.tasks.get(legacy)?;
        tracing::warn!(
            task_id,
            legacy_key = legacy,
            "progress found under legacy bare-name key"
        );
        Some((record, KeyTier::Legacy))
    }

    /// Insert or replace a record by its task ID.
    pub fn set_task(&mut self, record: TaskProgress) {
        self.tasks.insert(record.task_id.clone(), record);
    }

    /// Re-key the legacy record for `task_id` under the canonical ID.
    ///
    /// Returns `true` if a record was moved. An existing canonical record is
    /// never overwritten.
    pub fn migrate_legacy_key(&mut self, task_id: &str) -> bool {
        let legacy = legacy_key(task_id);
        if legacy == task_id || self.tasks.contains_key(task_id) {
            return false;
        }
        match self.tasks.remove(legacy) {
            Some(mut record) => {
                record.task_id = task_id.to_string();
                self.tasks.insert(task_id.to_string(), record);
                tracing::info!(task_id, legacy_key = legacy, "migrated legacy progress key");
                true
            }
            None => false,
        }
    }

    /// All records, ordered by task ID.
    pub fn all_tasks(&self) -> impl Iterator<Item = &TaskProgress> {
        self.tasks.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
