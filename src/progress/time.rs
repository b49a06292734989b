//! Elapsed-time resolution.
//!
//! Resolution order for a single task, first match wins:
//!
//! 1. An explicit positive `time_spent_minutes`.
//! 2. `started_at` plus an end point: `completed_at`, or the file's
//!    modification time when the task is completed without one.
//! 3. Zero.
//!
//! [`backfill_inferred_times`] is a separate, explicit operation for
//! historical data: it infers durations purely from modification-time
//! deltas between neighbouring task files and only touches completed
//! records that carry no time data at all.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{TaskProgress, TaskStatus};
use super::status::task_file_path;
use super::store::{KeyTier, ProgressStore};
use super::task_id::{normalize_task_id, task_id_for_path};
use crate::fs::{DiskStat, FileStat, TreeWalker};

/// Whole minutes between two instants, rounded to nearest and floored at zero.
#[must_use]
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 30) / 60
    }
}

/// Resolve minutes for a stored record. `file` is consulted only for its
/// modification time.
#[must_use]
pub fn time_for_record(record: &TaskProgress, file: &Path, stat: &dyn FileStat) -> i64 {
    if let Some(minutes) = record.time_spent_minutes.filter(|m| *m > 0) {
        return minutes;
    }

    let Some(started) = record.started_at else {
        return 0;
    };
    let end = match record.completed_at {
        Some(completed) => Some(completed),
        None if record.status == Some(TaskStatus::Completed) => stat.modified(file),
        None => None,
    };
    end.map_or(0, |end| minutes_between(started, end))
}

/// Resolve elapsed minutes for a task using the real file system.
#[must_use]
pub fn resolve_task_time(store: &ProgressStore, project_root: &Path, task_path: &str) -> i64 {
    resolve_task_time_with(store, project_root, task_path, &DiskStat)
}

/// Resolve elapsed minutes for a task with an explicit [`FileStat`].
#[must_use]
pub fn resolve_task_time_with(
    store: &ProgressStore,
    project_root: &Path,
    task_path: &str,
    stat: &dyn FileStat,
) -> i64 {
    let task_id = normalize_task_id(project_root, task_path);
    match store.get_task_progress(&task_id) {
        Some((record, _)) => time_for_record(record, &task_file_path(project_root, &task_id), stat),
        None => 0,
    }
}

// ============================================================================
// Backfill
// ============================================================================

/// Options for [`backfill_inferred_times`].
#[derive(Debug, Clone, Copy)]
pub struct BackfillOptions {
    /// Deltas above this are treated as breaks, not work
    pub max_minutes: i64,
    /// Compute the report without modifying the store
    pub dry_run: bool,
}

/// A task whose time was inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfilledTask {
    pub task_id: String,
    pub minutes: i64,
}

/// Outcome of a backfill run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub updated: Vec<BackfilledTask>,
    /// Completed records that already carried time data
    pub skipped_has_time: u32,
    /// Completed records with no usable predecessor timestamp
    pub skipped_no_signal: u32,
    pub dry_run: bool,
}

/// Infer durations for completed tasks that have no time data.
///
/// Tracked files are grouped by directory and visited in name order. A
/// task's duration is the gap between its modification time and that of the
/// previous tracked file in the same directory. The first file of a
/// directory has no predecessor; gaps that are not positive or exceed
/// `max_minutes` are skipped.
pub fn backfill_inferred_times(
    store: &mut ProgressStore,
    project_root: &Path,
    walker: &TreeWalker,
    stat: &dyn FileStat,
    options: BackfillOptions,
) -> BackfillReport {
    let mut report = BackfillReport {
        dry_run: options.dry_run,
        ..BackfillReport::default()
    };

    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let mut name_counts: BTreeMap<OsString, usize> = BTreeMap::new();
    for file in walker.tracked_files() {
        if let Some(name) = file.file_name() {
            *name_counts.entry(name.to_os_string()).or_default() += 1;
        }
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        by_dir.entry(dir).or_default().push(file);
    }
    let shares_name = |file: &Path| {
        file.file_name()
            .and_then(|name| name_counts.get(name))
            .is_some_and(|count| *count > 1)
    };

    for files in by_dir.values() {
        let mut previous: Option<DateTime<Utc>> = None;
        for file in files {
            let modified = stat.modified(file);
            let task_id = task_id_for_path(project_root, file);

            // A bare-name record shared by several files belongs to none of them.
            let record = match store.get_task_progress(&task_id) {
                Some((_, KeyTier::Legacy)) if shares_name(file) => None,
                found => found.map(|(record, _)| record.clone()),
            }
            .filter(|record| record.status == Some(TaskStatus::Completed));

            if let Some(mut record) = record {
                if record.has_time_data() {
                    report.skipped_has_time += 1;
                } else if let Some((started, completed, minutes)) =
                    infer(previous, modified, options.max_minutes)
                {
                    if !options.dry_run {
                        record.task_id.clone_from(&task_id);
                        record.started_at = Some(started);
                        record.completed_at = Some(completed);
                        record.time_spent_minutes = Some(minutes);
                        store.migrate_legacy_key(&task_id);
                        store.set_task(record);
                    }
                    tracing::info!(task_id = %task_id, minutes, dry_run = options.dry_run, "inferred task time");
                    report.updated.push(BackfilledTask { task_id, minutes });
                } else {
                    report.skipped_no_signal += 1;
                }
            }

            previous = modified;
        }
    }

    report
}

fn infer(
    previous: Option<DateTime<Utc>>,
    current: Option<DateTime<Utc>>,
    max_minutes: i64,
) -> Option<(DateTime<Utc>, DateTime<Utc>, i64)> {
    let (start, end) = (previous?, current?);
    let minutes = minutes_between(start, end);
    (minutes > 0 && minutes <= max_minutes).then_some((start, end, minutes))
}
