//! Festival-level entry point for queries and mutations.
//!
//! Every mutation resolves the task reference (rejecting ambiguous bare
//! names), loads the store, re-keys a legacy record if one was hit, applies
//! the change and saves. A legacy record whose bare name is shared by
//! several tracked files is left in place and the task starts from a fresh
//! record. Content-derived status is never written back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::aggregate::{Aggregator, FestivalProgress, PhaseProgress, SequenceProgress};
use super::record::{TaskProgress, TaskStatus};
use super::status::{status_from_file, task_file_path};
use super::store::{legacy_key, KeyTier, ProgressStore};
use super::task_id::{normalize_task_id, resolve_task_id};
use super::time::{backfill_inferred_times, time_for_record, BackfillOptions, BackfillReport};
use crate::cancel::CancelToken;
use crate::config::FestConfig;
use crate::error::{FestError, Result};
use crate::fs::{DiskStat, FileStat, TreeWalker};

/// Combined view of one task, as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub task_id: String,
    /// Status with blockers applied
    pub display_status: TaskStatus,
    /// Whether a stored record exists
    pub tracked: bool,
    #[serde(flatten)]
    pub record: TaskProgress,
}

/// Result of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub record: TaskProgress,
    /// `false` when the call left the stored record as it was
    pub changed: bool,
}

/// Build the combined view of a task without persisting anything.
///
/// Starts from the stored record, or a fresh record carrying the
/// content-derived status. The record's `time_spent_minutes` holds the
/// resolved minutes and missing timestamps are inferred: a completed task
/// without `completed_at` takes the file's modification time, and a task
/// with resolved minutes but no `started_at` gets `completed_at - minutes`.
#[must_use]
pub fn resolve_task_progress(
    store: &ProgressStore,
    project_root: &Path,
    task_path: &str,
    stat: &dyn FileStat,
) -> TaskView {
    let task_id = normalize_task_id(project_root, task_path);
    let file = task_file_path(project_root, &task_id);

    let Some((stored, _)) = store.get_task_progress(&task_id) else {
        let status = status_from_file(&file);
        let mut record = TaskProgress::new(&task_id);
        record.status = Some(status);
        return TaskView {
            task_id,
            display_status: status,
            tracked: false,
            record,
        };
    };

    let minutes = time_for_record(stored, &file, stat);
    let mut record = stored.clone();
    record.task_id.clone_from(&task_id);
    let status = match record.status {
        Some(status) => status,
        None => status_from_file(&file),
    };
    record.status = Some(status);
    if status == TaskStatus::Completed && record.completed_at.is_none() {
        record.completed_at = stat.modified(&file);
    }
    if minutes > 0 {
        record.time_spent_minutes = Some(minutes);
        if record.started_at.is_none() {
            record.started_at = record.completed_at.map(|end| end - Duration::minutes(minutes));
        }
    }

    TaskView {
        task_id,
        display_status: record.display_status().unwrap_or(status),
        tracked: true,
        record,
    }
}

// ============================================================================
// Progress Manager
// ============================================================================

/// Owns a festival root and its configuration.
pub struct ProgressManager {
    root: PathBuf,
    config: FestConfig,
    walker: TreeWalker,
    cancel: CancelToken,
    stat: Box<dyn FileStat>,
}

impl std::fmt::Debug for ProgressManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressManager")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProgressManager {
    /// Open a festival rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, config: FestConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FestError::not_found("festival root", root));
        }
        let walker = TreeWalker::new(&root, &config)?;
        Ok(Self {
            root,
            config,
            walker,
            cancel: CancelToken::new(),
            stat: Box::new(DiskStat),
        })
    }

    /// Use `cancel` for every subsequent operation.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the modification-time source.
    #[must_use]
    pub fn with_file_stat(mut self, stat: impl FileStat + 'static) -> Self {
        self.stat = Box::new(stat);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &FestConfig {
        &self.config
    }

    /// Path of the progress store.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.config.progress_path(&self.root)
    }

    /// Load the store from disk.
    pub fn load_store(&self) -> Result<ProgressStore> {
        self.cancel.check("load progress store")?;
        Ok(ProgressStore::load(&self.store_path())?
            .with_legacy_lookup(self.config.legacy_key_lookup))
    }

    fn save_store(&self, store: &ProgressStore) -> Result<()> {
        self.cancel.check("save progress store")?;
        store.save()
    }

    /// Canonical ID for a user-supplied task reference.
    pub fn resolve_task_id(&self, task: &str) -> Result<String> {
        if task.trim().is_empty() {
            return Err(FestError::validation("task reference is empty"));
        }
        resolve_task_id(&self.root, task, &self.walker)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Authoritative status of a task (stored, else content-derived).
    pub fn resolve_task_status(&self, task: &str) -> Result<TaskStatus> {
        let task_id = self.resolve_task_id(task)?;
        let store = self.load_store()?;
        Ok(super::status::resolve_task_status(&store, &self.root, &task_id))
    }

    /// Elapsed minutes for a task.
    pub fn resolve_task_time(&self, task: &str) -> Result<i64> {
        let task_id = self.resolve_task_id(task)?;
        let store = self.load_store()?;
        Ok(super::time::resolve_task_time_with(
            &store,
            &self.root,
            &task_id,
            self.stat.as_ref(),
        ))
    }

    /// Combined view of a task.
    pub fn resolve_task_progress(&self, task: &str) -> Result<TaskView> {
        let task_id = self.resolve_task_id(task)?;
        let store = self.load_store()?;
        Ok(resolve_task_progress(
            &store,
            &self.root,
            &task_id,
            self.stat.as_ref(),
        ))
    }

    pub fn festival_progress(&self) -> Result<FestivalProgress> {
        let store = self.load_store()?;
        self.aggregator(&store).festival()
    }

    pub fn phase_progress(&self, phase: &str) -> Result<PhaseProgress> {
        let store = self.load_store()?;
        self.aggregator(&store).phase(phase)
    }

    pub fn sequence_progress(&self, phase: &str, sequence: &str) -> Result<SequenceProgress> {
        let store = self.load_store()?;
        self.aggregator(&store).sequence(phase, sequence)
    }

    fn aggregator<'a>(&'a self, store: &'a ProgressStore) -> Aggregator<'a> {
        Aggregator::new(&self.walker, store, self.stat.as_ref(), &self.cancel)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Mark a task in progress, stamping `started_at` the first time.
    /// Reopening a completed task drops its `completed_at`.
    pub fn mark_in_progress(&self, task: &str) -> Result<MutationOutcome> {
        self.mutate(task, "start", |record, now| {
            reopen(record, TaskStatus::InProgress);
            record.started_at.get_or_insert(now);
        })
    }

    /// Record a completion percentage.
    ///
    /// 100 completes the task, 1-99 puts it in progress and 0 resets it to
    /// pending. Anything above 100 is rejected.
    pub fn update_progress(&self, task: &str, percent: u32) -> Result<MutationOutcome> {
        let percent = u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| {
                FestError::validation(format!("progress must be between 0 and 100, got {percent}"))
            })?;

        self.mutate(task, "set progress", |record, now| match percent {
            100 => complete(record, now),
            0 => {
                reopen(record, TaskStatus::Pending);
                record.progress = 0;
            }
            p => {
                reopen(record, TaskStatus::InProgress);
                record.progress = p;
                record.started_at.get_or_insert(now);
            }
        })
    }

    /// Mark a task completed. Calling it again is a no-op.
    pub fn mark_complete(&self, task: &str) -> Result<MutationOutcome> {
        self.mutate(task, "complete", complete)
    }

    /// Attach a blocker message. The stored status is left alone, so a task
    /// without one keeps deriving its status from the document.
    pub fn report_blocker(&self, task: &str, message: &str) -> Result<MutationOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(FestError::validation("blocker message must not be empty"));
        }
        self.mutate(task, "block", |record, _| {
            record.blocker_message = Some(message.to_string());
        })
    }

    /// Remove a blocker message.
    pub fn clear_blocker(&self, task: &str) -> Result<MutationOutcome> {
        self.mutate(task, "unblock", |record, _| {
            record.blocker_message = None;
            if record.status == Some(TaskStatus::Blocked) {
                record.status = Some(TaskStatus::InProgress);
            }
        })
    }

    /// Infer missing durations for completed tasks from file timestamps.
    pub fn backfill_times(&self, dry_run: bool) -> Result<BackfillReport> {
        let mut store = self.load_store()?;
        let report = backfill_inferred_times(
            &mut store,
            &self.root,
            &self.walker,
            self.stat.as_ref(),
            BackfillOptions {
                max_minutes: self.config.max_inferred_minutes,
                dry_run,
            },
        );
        if !dry_run && !report.updated.is_empty() {
            self.save_store(&store)?;
        }
        Ok(report)
    }

    fn mutate<F>(&self, task: &str, action: &str, apply: F) -> Result<MutationOutcome>
    where
        F: FnOnce(&mut TaskProgress, DateTime<Utc>),
    {
        let task_id = self.resolve_task_id(task)?;
        let mut store = self.load_store()?;

        let legacy_hit = matches!(
            store.get_task_progress(&task_id),
            Some((_, KeyTier::Legacy))
        );
        let shared = legacy_hit && self.shares_legacy_key(&task_id);
        if shared {
            tracing::warn!(
                task_id = %task_id,
                legacy_key = legacy_key(&task_id),
                "legacy key names several tracked files, not inheriting its record"
            );
        }
        let migrated = legacy_hit && !shared && store.migrate_legacy_key(&task_id);

        let before = store
            .get_task_progress(&task_id)
            .filter(|_| !shared)
            .map(|(record, _)| record.clone())
            .unwrap_or_else(|| TaskProgress::new(&task_id));
        let mut record = before.clone();
        record.task_id.clone_from(&task_id);
        apply(&mut record, Utc::now());

        let changed = record != before;
        if changed || migrated {
            store.set_task(record.clone());
            self.save_store(&store)?;
        }

        tracing::info!(
            task_id = %task_id,
            action,
            status = ?record.status,
            changed,
            migrated,
            "updated task progress"
        );
        Ok(MutationOutcome { record, changed })
    }

    /// Whether more than one tracked file has the bare name of `task_id`.
    fn shares_legacy_key(&self, task_id: &str) -> bool {
        let name = std::ffi::OsStr::new(legacy_key(task_id));
        self.walker
            .tracked_files()
            .iter()
            .filter(|path| path.file_name() == Some(name))
            .count()
            > 1
    }
}

/// Move a task to a non-completed status.
fn reopen(record: &mut TaskProgress, status: TaskStatus) {
    record.status = Some(status);
    record.completed_at = None;
}

fn complete(record: &mut TaskProgress, now: DateTime<Utc>) {
    if record.status == Some(TaskStatus::Completed) {
        record.completed_at.get_or_insert(now);
    } else {
        record.completed_at = Some(now);
    }
    record.status = Some(TaskStatus::Completed);
    record.progress = 100;
}
