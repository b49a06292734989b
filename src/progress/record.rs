//! Task status and progress record types.
//!
//! - [`TaskStatus`] - Stored or derived status of a task
//! - [`TaskProgress`] - The persisted per-task record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Task Status
// ============================================================================

/// Status of a task.
///
/// `Blocked` is accepted for compatibility with stores written by older
/// tools; the engine itself expresses blockage through
/// [`TaskProgress::blocker_message`] and [`TaskProgress::display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// Stable string form used in the persisted store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" | "complete" | "done" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

// ============================================================================
// Task Progress
// ============================================================================

/// Persisted progress for one tracked file.
///
/// The task ID is the store key; it is skipped on (de)serialization and
/// restored by the store on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Canonical forward-slash path relative to the festival root
    #[serde(skip)]
    pub task_id: String,

    /// Explicitly set status; `None` defers to the task document
    #[serde(default, with = "stored_status")]
    pub status: Option<TaskStatus>,

    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,

    #[serde(default)]
    pub blocker_message: Option<String>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Explicit duration; authoritative when positive
    #[serde(default)]
    pub time_spent_minutes: Option<i64>,
}

impl TaskProgress {
    /// Create a record with no status and no timing data.
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: None,
            progress: 0,
            blocker_message: None,
            started_at: None,
            completed_at: None,
            time_spent_minutes: None,
        }
    }

    /// Whether a non-blank blocker message is recorded.
    #[must_use]
    pub fn has_blocker(&self) -> bool {
        self.blocker_message
            .as_deref()
            .is_some_and(|msg| !msg.trim().is_empty())
    }

    /// Status shown to users: blocked while a blocker message is present,
    /// otherwise the stored status, if any.
    #[must_use]
    pub fn display_status(&self) -> Option<TaskStatus> {
        if self.has_blocker() {
            Some(TaskStatus::Blocked)
        } else {
            self.status
        }
    }

    /// Whether any field that carries timing information is set.
    #[must_use]
    pub fn has_time_data(&self) -> bool {
        self.time_spent_minutes.is_some() || self.started_at.is_some() || self.completed_at.is_some()
    }
}

/// An unset status is written as `""`; `""` and `null` read back as unset.
mod stored_status {
    use super::TaskStatus;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        status: &Option<TaskStatus>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match status {
            Some(status) => status.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TaskStatus>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(de::Error::custom),
        }
    }
}
