//! Status resolution.
//!
//! A stored status always wins. Without one (no record, or a record that
//! only carries a blocker or timing data) the status is derived from the
//! task document's checkboxes; an unreadable document counts as having none.

use std::path::{Path, PathBuf};

use super::checkbox;
use super::record::TaskStatus;
use super::store::ProgressStore;
use super::task_id::normalize_task_id;

/// Location on disk of a normalized task ID.
#[must_use]
pub fn task_file_path(project_root: &Path, task_id: &str) -> PathBuf {
    let path = Path::new(task_id);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Status derived only from the document at `path`. Never fails.
#[must_use]
pub fn status_from_file(path: &Path) -> TaskStatus {
    match std::fs::read_to_string(path) {
        Ok(content) => checkbox::status_from_content(&content),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "task unreadable, treating as pending");
            TaskStatus::Pending
        }
    }
}

/// Resolve the authoritative status of a task.
///
/// `task_path` may be absolute, relative to `project_root`, or a bare file
/// name (looked up through the store's legacy tier).
#[must_use]
pub fn resolve_task_status(store: &ProgressStore, project_root: &Path, task_path: &str) -> TaskStatus {
    let task_id = normalize_task_id(project_root, task_path);

    let stored = store
        .get_task_progress(&task_id)
        .and_then(|(record, tier)| record.status.map(|status| (status, tier)));
    if let Some((status, tier)) = stored {
        tracing::debug!(task_id = %task_id, ?tier, %status, "stored status");
        return status;
    }

    let status = status_from_file(&task_file_path(project_root, &task_id));
    tracing::debug!(task_id = %task_id, %status, "content-derived status");
    status
}
