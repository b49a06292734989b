//! Configuration management for fest.
//!
//! Settings live in `.fest/config.json` under the festival root. Every field
//! has a default, so a missing file yields a usable configuration.
//!
//! # Example config.json
//!
//! ```json
//! {
//!   "progressFile": ".fest/progress.json",
//!   "ignore": ["dungeon/**", "*.bak"],
//!   "legacyKeyLookup": true,
//!   "maxInferredMinutes": 480,
//!   "output": { "verbose": false, "noColor": false }
//! }
//! ```

use crate::error::{FestError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding fest's own files inside a festival.
pub const FEST_DIR: &str = ".fest";

/// Default location of the progress store, relative to the festival root.
pub const DEFAULT_PROGRESS_FILE: &str = ".fest/progress.json";

/// Upper bound for a single inferred duration during time backfill.
pub const DEFAULT_MAX_INFERRED_MINUTES: i64 = 480;

/// Directories never descended into when collecting tracked files.
pub fn default_ignore_dirs() -> &'static [&'static str] {
    &["node_modules", "target", "dist", "build", "vendor", "archive"]
}

/// Output options that used to be process-wide toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Emit debug logging
    #[serde(default)]
    pub verbose: bool,

    /// Disable ANSI colors
    #[serde(default)]
    pub no_color: bool,
}

/// Festival-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FestConfig {
    /// Progress store path, relative to the festival root
    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,

    /// Glob patterns (relative to the root) pruned from every walk
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Whether records stored under a bare file name are still honored
    #[serde(default = "default_true")]
    pub legacy_key_lookup: bool,

    /// Largest per-task duration the backfill will infer from timestamps
    #[serde(default = "default_max_inferred_minutes")]
    pub max_inferred_minutes: i64,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_progress_file() -> PathBuf {
    PathBuf::from(DEFAULT_PROGRESS_FILE)
}

fn default_true() -> bool {
    true
}

fn default_max_inferred_minutes() -> i64 {
    DEFAULT_MAX_INFERRED_MINUTES
}

impl Default for FestConfig {
    fn default() -> Self {
        Self {
            progress_file: default_progress_file(),
            ignore: Vec::new(),
            legacy_key_lookup: true,
            max_inferred_minutes: DEFAULT_MAX_INFERRED_MINUTES,
            output: OutputConfig::default(),
        }
    }
}

impl FestConfig {
    /// Load configuration from a festival directory.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(festival_dir: &Path) -> Result<Self> {
        let path = Self::config_path(festival_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| FestError::io(&path, e))?;
        let config: FestConfig =
            serde_json::from_str(&content).map_err(|e| FestError::parse(&path, e.to_string()))?;
        config.validate(&path)?;
        Ok(config)
    }

    /// Get the config.json path for a festival
    pub fn config_path(festival_dir: &Path) -> PathBuf {
        festival_dir.join(FEST_DIR).join("config.json")
    }

    /// Absolute path of the progress store for a festival
    pub fn progress_path(&self, festival_dir: &Path) -> PathBuf {
        if self.progress_file.is_absolute() {
            self.progress_file.clone()
        } else {
            festival_dir.join(&self.progress_file)
        }
    }

    /// Compile the ignore patterns into a matcher.
    pub fn ignore_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore {
            let glob = Glob::new(pattern).map_err(|e| {
                FestError::validation(format!("invalid ignore pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| FestError::validation(format!("invalid ignore patterns: {}", e)))
    }

    /// Builder-style override of the output options.
    #[must_use]
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.max_inferred_minutes <= 0 {
            return Err(FestError::validation(format!(
                "maxInferredMinutes must be positive in {}",
                path.display()
            )));
        }
        self.ignore_set().map(|_| ())
    }
}
