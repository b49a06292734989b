//! Task ID normalization and bare-name resolution.
//!
//! Canonical task IDs are forward-slash paths relative to the festival root,
//! e.g. `002_IMPLEMENT/01_core/03_parser.md`.

use std::path::{Component, Path, PathBuf};

use crate::error::{FestError, Result};
use crate::fs::TreeWalker;

/// Whether `input` names a file without any directory part.
#[must_use]
pub fn is_bare(input: &str) -> bool {
    !input.is_empty() && !input.chars().any(std::path::is_separator)
}

/// Lexically clean a path: drop `.` components and fold `..` into the
/// preceding normal component where possible. Does not touch the disk.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(cleaned.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Render a path with forward slashes regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

fn relative_to_root(project_root: &Path, path: &Path) -> Option<PathBuf> {
    let root = clean_path(project_root);
    if let Ok(rel) = path.strip_prefix(&root) {
        return Some(rel.to_path_buf());
    }
    // Fall back to resolved paths so symlinked roots (e.g. /tmp) still match.
    let canonical_root = project_root.canonicalize().ok()?;
    let canonical_path = path.canonicalize().ok()?;
    canonical_path
        .strip_prefix(&canonical_root)
        .ok()
        .map(Path::to_path_buf)
}

/// Canonicalize a task reference into a store key.
///
/// - Absolute path under `project_root`: the root is stripped.
/// - Relative path: cleaned.
/// - Bare file name: returned unchanged; see [`resolve_task_id`].
///
/// ```
/// use fest::progress::normalize_task_id;
/// use std::path::Path;
///
/// let root = Path::new("/work/my-fest");
/// assert_eq!(
///     normalize_task_id(root, "/work/my-fest/001_P/01_s/01_task.md"),
///     "001_P/01_s/01_task.md"
/// );
/// assert_eq!(normalize_task_id(root, "./001_P/01_s/../01_s/01_task.md"), "001_P/01_s/01_task.md");
/// assert_eq!(normalize_task_id(root, "01_task.md"), "01_task.md");
/// ```
#[must_use]
pub fn normalize_task_id(project_root: &Path, input: &str) -> String {
    let input = input.trim();
    if is_bare(input) {
        return input.to_string();
    }

    let path = clean_path(Path::new(input));
    if path.is_absolute() {
        if let Some(rel) = relative_to_root(project_root, &path) {
            return to_slash(&rel);
        }
    }
    to_slash(&path)
}

/// Task ID for a path produced by walking `project_root`.
///
/// Such paths carry the root as given, which may itself be relative.
#[must_use]
pub fn task_id_for_path(project_root: &Path, path: &Path) -> String {
    match path.strip_prefix(project_root) {
        Ok(rel) => to_slash(&clean_path(rel)),
        Err(_) => normalize_task_id(project_root, &path.to_string_lossy()),
    }
}

/// Normalize `input` and, if it was given as a bare file name, resolve it
/// against the tracked files beneath the root.
///
/// A bare name matching no tracked file stays bare. A name matching several
/// files is rejected with every candidate listed; picking one could update
/// the wrong task.
pub fn resolve_task_id(project_root: &Path, input: &str, walker: &TreeWalker) -> Result<String> {
    let input = input.trim();
    let normalized = normalize_task_id(project_root, input);
    // `./01_x.md` cleans to a bare-looking ID but names a root-level file.
    if !is_bare(input) {
        return Ok(normalized);
    }

    let with_suffix = format!("{normalized}.md");
    let mut candidates: Vec<String> = walker
        .tracked_files()
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy())
                .is_some_and(|name| name == normalized || name == with_suffix)
        })
        .map(|path| task_id_for_path(project_root, &path))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => {
            tracing::debug!(task = %normalized, "bare task name matched no tracked file");
            Ok(normalized)
        }
        1 => Ok(candidates.into_iter().next().unwrap_or(normalized)),
        n => Err(FestError::ambiguous(
            format!(
                "task '{}' matches {} files; use a path relative to the festival root",
                normalized, n
            ),
            candidates,
        )),
    }
}
