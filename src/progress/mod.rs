//! Progress derivation for festivals.
//!
//! Status and time are resolved from two sources: the persisted
//! [`ProgressStore`] and, when no status is stored, the checkboxes of the task
//! document itself. [`ProgressManager`] ties both to a festival root and
//! exposes the mutating operations.
//!
//! # Modules
//!
//! - [`record`] - Persisted record and status types
//! - [`store`] - JSON progress store with legacy key lookup
//! - [`checkbox`] - Checkbox scanning of task documents
//! - [`status`] - Status resolution
//! - [`time`] - Elapsed-time resolution and backfill
//! - [`task_id`] - Task ID normalization
//! - [`aggregate`] - Festival, phase and sequence snapshots
//! - [`manager`] - Queries and mutations bound to one festival

pub mod aggregate;
pub mod checkbox;
pub mod manager;
pub mod record;
pub mod status;
pub mod store;
pub mod task_id;
pub mod time;

pub use aggregate::{
    Aggregator, Blocker, FestivalProgress, PhaseProgress, ProgressSnapshot, SequenceProgress,
};
pub use checkbox::{count_checkboxes, status_from_content, CheckboxCounts};
pub use manager::{resolve_task_progress, MutationOutcome, ProgressManager, TaskView};
pub use record::{TaskProgress, TaskStatus};
pub use status::resolve_task_status;
pub use store::{KeyTier, ProgressStore, STORE_VERSION};
pub use task_id::{normalize_task_id, resolve_task_id, task_id_for_path};
pub use time::{
    backfill_inferred_times, resolve_task_time, resolve_task_time_with, BackfillOptions,
    BackfillReport, BackfilledTask,
};
