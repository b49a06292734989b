//! Test fixtures for creating reproducible festival trees.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::FestConfig;
use crate::progress::ProgressManager;

/// A temporary festival directory.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = FestivalFixture::new()
///     .with_file("001_PLAN/01_design/01_sketch.md", "- [x] done\n")
///     .with_task("001_PLAN/01_design/02_review.md");
/// let manager = fixture.manager();
/// ```
pub struct FestivalFixture {
    temp_dir: TempDir,
}

impl FestivalFixture {
    /// Create an empty festival.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A two-phase festival with goal documents, gates and mixed checkbox
    /// states.
    #[must_use]
    pub fn sample() -> Self {
        Self::new()
            .with_file("FESTIVAL_OVERVIEW.md", "# Overview\n")
            .with_file("001_PLAN/PHASE_GOAL.md", "# Goal\n")
            .with_file("001_PLAN/01_design/SEQUENCE_GOAL.md", "# Goal\n")
            .with_file(
                "001_PLAN/01_design/01_design.md",
                "## Requirements\n- [x] sketch\n- [x] review\n",
            )
            .with_file(
                "001_PLAN/01_design/02_api.md",
                "## Definition of Done\n- [x] routes\n- [ ] errors\n",
            )
            .with_task("001_PLAN/01_design/03_testing_and_verify.md")
            .with_task("002_BUILD/01_core/01_design.md")
            .with_task("002_BUILD/01_core/02_commit.md")
    }

    /// Write `content` to `rel`, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[must_use]
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(&path, content).expect("Failed to write fixture file");
        self
    }

    /// Create an empty task file.
    #[must_use]
    pub fn with_task(self, rel: &str) -> Self {
        self.with_file(rel, "")
    }

    /// Write `.fest/config.json`.
    #[must_use]
    pub fn with_config(self, json: &str) -> Self {
        self.with_file(".fest/config.json", json)
    }

    /// Root of the festival.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `rel` inside the festival.
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }

    /// Open a manager with the festival's own configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    #[must_use]
    pub fn manager(&self) -> ProgressManager {
        let config = FestConfig::load(self.root()).expect("Failed to load fixture config");
        ProgressManager::open(self.root(), config).expect("Failed to open fixture festival")
    }
}

impl Default for FestivalFixture {
    fn default() -> Self {
        Self::new()
    }
}
