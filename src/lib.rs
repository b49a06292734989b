//! fest - progress tracking for festival-structured project plans
//!
//! A festival is a directory tree of markdown task documents organized into
//! phases (`001_PLAN/`) and sequences (`01_design/`). This crate derives
//! status, elapsed time and aggregate progress from that tree and a small
//! JSON progress store kept alongside it.
//!
//! # Architecture
//!
//! - [`classify`] - Task, gate and goal classification of file names
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//! - [`fs`] - Directory walking and modification times
//! - [`progress`] - Store, resolvers, aggregation and mutations
//! - [`cancel`] - Cooperative cancellation
//! - [`testing`] - Testing infrastructure (mocks, fixtures)
//!
//! # Example
//!
//! ```rust,ignore
//! use fest::config::FestConfig;
//! use fest::progress::ProgressManager;
//!
//! let config = FestConfig::load(root)?;
//! let manager = ProgressManager::open(root, config)?;
//!
//! manager.mark_in_progress("001_PLAN/01_design/01_sketch.md")?;
//! let progress = manager.festival_progress()?;
//! println!("{}% complete", progress.snapshot.percentage);
//! ```

pub mod cancel;
pub mod classify;
pub mod config;
pub mod error;
pub mod fs;
pub mod progress;
pub mod testing;

// Re-export commonly used types
pub use error::{FestError, Result};

pub use cancel::CancelToken;
pub use classify::{classify, is_tracked, FileInfo, FileType};
pub use config::{FestConfig, OutputConfig};

pub use progress::{
    normalize_task_id, resolve_task_id, resolve_task_progress, resolve_task_status,
    resolve_task_time, FestivalProgress, PhaseProgress, ProgressManager, ProgressSnapshot,
    ProgressStore, SequenceProgress, TaskProgress, TaskStatus,
};

pub use testing::MockFileStat;
