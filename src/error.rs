//! Custom error types for fest.
//!
//! The engine distinguishes four families of failure: missing inputs,
//! rejected inputs, I/O, and malformed persisted data. Content-derived
//! inference never produces any of these; it degrades to conservative
//! defaults instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fest operations
#[derive(Error, Debug)]
pub enum FestError {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// A required project root, scope directory or file is absent
    #[error("Not found: {what}: {path}")]
    NotFound { what: String, path: PathBuf },

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Caller input was rejected (out-of-range percentage, ambiguous task, ...)
    #[error("Validation failed: {message}{}", format_candidates(.candidates))]
    Validation {
        message: String,
        candidates: Vec<String>,
    },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted data could not be decoded
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Operation was cancelled before it started
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    IoRaw(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        String::new()
    } else {
        format!(" (candidates: {})", candidates.join(", "))
    }
}

impl FestError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            candidates: Vec::new(),
        }
    }

    /// Create a validation error listing the inputs the caller must choose from
    pub fn ambiguous(message: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            candidates,
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error was caused by caller input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// Candidate paths attached to an ambiguity error
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::Validation { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => 2,
            Self::NotFound { .. } => 3,
            Self::Parse { .. } | Self::Json(_) => 4,
            Self::Io { .. } | Self::IoRaw(_) => 5,
            Self::Cancelled { .. } => 130,
        }
    }
}

/// Type alias for fest results
pub type Result<T> = std::result::Result<T, FestError>;
