//! File classification for festival trees.
//!
//! Maps a bare file name to a [`FileType`] with an ordered rule table. The
//! first rule whose predicate matches decides the type; a name that falls
//! through every rule is a [`FileType::Task`].
//!
//! ```
//! use fest::classify::{classify, FileType};
//!
//! assert_eq!(classify("01_design.md"), FileType::Task);
//! assert_eq!(classify("04_testing_and_verify.md"), FileType::Gate);
//! assert_eq!(classify("SEQUENCE_GOAL.md"), FileType::Goal);
//! assert_eq!(classify("README.md"), FileType::Unknown);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ============================================================================
// File Types
// ============================================================================

/// Semantic type of a file inside a festival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// A numbered work item
    Task,
    /// A numbered quality checkpoint (review, testing, commit)
    Gate,
    /// A fixed-name document describing intent at some scope
    Goal,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Whether files of this type count toward progress totals.
    #[must_use]
    pub fn is_tracked(self) -> bool {
        matches!(self, FileType::Task | FileType::Gate)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Task => write!(f, "task"),
            FileType::Gate => write!(f, "gate"),
            FileType::Goal => write!(f, "goal"),
            FileType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classification of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub file_type: FileType,
}

impl FileInfo {
    /// Classify the file at `path` by its final component.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = classify(&name);
        Self {
            name,
            path: path.to_path_buf(),
            file_type,
        }
    }

    #[must_use]
    pub fn is_task(&self) -> bool {
        self.file_type == FileType::Task
    }

    #[must_use]
    pub fn is_gate(&self) -> bool {
        self.file_type == FileType::Gate
    }

    #[must_use]
    pub fn is_goal(&self) -> bool {
        self.file_type == FileType::Goal
    }

    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.file_type.is_tracked()
    }
}

// ============================================================================
// Rule Table
// ============================================================================

/// Fixed document names. Matched case-sensitively.
pub const GOAL_FILES: &[&str] = &[
    "SEQUENCE_GOAL.md",
    "PHASE_GOAL.md",
    "FESTIVAL_GOAL.md",
    "FESTIVAL_OVERVIEW.md",
    "OVERVIEW.md",
    "TODO.md",
    "FESTIVAL_TODO.md",
    "CONTEXT.md",
    "FESTIVAL_RULES.md",
    "RULES.md",
];

/// Name parts that are gates only when they match exactly.
pub const GATE_EXACT_NAMES: &[&str] = &["commit"];

/// Name-part fragments that mark a gate wherever they appear.
pub const GATE_SUBSTRINGS: &[&str] = &[
    "gate",
    "testing_and_verify",
    "code_review",
    "review_results_iterate",
];

/// One classification rule: a predicate over the file name and the type it yields.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub file_type: FileType,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("file_type", &self.file_type)
            .finish()
    }
}

/// Ordered classification rules. Evaluation stops at the first match.
pub const RULES: &[Rule] = &[
    Rule {
        name: "goal_document",
        matches: is_goal_name,
        file_type: FileType::Goal,
    },
    Rule {
        name: "not_numbered_markdown",
        matches: is_not_task_pattern,
        file_type: FileType::Unknown,
    },
    Rule {
        name: "gate_exact",
        matches: is_gate_exact,
        file_type: FileType::Gate,
    },
    Rule {
        name: "gate_substring",
        matches: has_gate_substring,
        file_type: FileType::Gate,
    },
];

/// Classify a bare file name.
#[must_use]
pub fn classify(name: &str) -> FileType {
    RULES
        .iter()
        .find(|rule| (rule.matches)(name))
        .map_or(FileType::Task, |rule| rule.file_type)
}

/// Whether a file name counts toward progress totals.
#[must_use]
pub fn is_tracked(name: &str) -> bool {
    classify(name).is_tracked()
}

fn task_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)^[0-9]{2}[._].*\.md$").expect("valid task pattern"))
}

fn is_goal_name(name: &str) -> bool {
    GOAL_FILES.contains(&name)
}

fn is_not_task_pattern(name: &str) -> bool {
    !task_pattern().is_match(name)
}

fn is_gate_exact(name: &str) -> bool {
    let part = name_part(name);
    GATE_EXACT_NAMES.iter().any(|exact| part == *exact)
}

fn has_gate_substring(name: &str) -> bool {
    let part = name_part(name);
    GATE_SUBSTRINGS.iter().any(|fragment| part.contains(fragment))
}

/// Lower-cased name with the numeric prefix and `.md` suffix removed.
///
/// `"07_Commit.md"` becomes `"commit"`; `"02.notes.md"` becomes `"notes"`.
#[must_use]
pub fn name_part(name: &str) -> String {
    let stem = name.strip_suffix(".md").unwrap_or(name);
    let rest = match stem.find('_') {
        Some(idx) => &stem[idx + 1..],
        None => stem.get(3..).unwrap_or(""),
    };
    rest.to_lowercase()
}

// ============================================================================
// Directory Predicates
// ============================================================================

fn has_digit_prefix(name: &str, digits: usize) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > digits
        && bytes[..digits].iter().all(u8::is_ascii_digit)
        && bytes[digits] == b'_'
}

/// `001_PLANNING` style directory names.
#[must_use]
pub fn is_phase_dir(name: &str) -> bool {
    has_digit_prefix(name, 3)
}

/// `01_requirements` style directory names.
#[must_use]
pub fn is_sequence_dir(name: &str) -> bool {
    has_digit_prefix(name, 2)
}
