//! Checkbox scanning for task documents.
//!
//! Counts list-item checkboxes, preferring the checklist under a
//! "definition of done"-style heading over stray checkboxes elsewhere in the
//! document.
//!
//! Recognised markers:
//! - `- [ ]`, `- [x]`, `- [X]` and the same with `*` bullets
//! - emoji at the start of a list item or line: completed (`✅ ✔️ ☑️`),
//!   in progress (`🚧 🔄 ⏳`), blocked (`🚫 ⛔ ❌`), not started (`⬜ 🔲`)
//!
//! Only completed markers count as checked.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::record::TaskStatus;

/// Section headings searched for checkboxes, highest priority first.
pub const PRIORITY_SECTIONS: &[&str] = &[
    "definition of done",
    "requirements",
    "acceptance criteria",
    "deliverables",
    "checklist",
];

const COMPLETED_MARKERS: &[&str] = &["✅", "✔️", "✔", "☑️", "☑"];
const IN_PROGRESS_MARKERS: &[&str] = &["🚧", "🔄", "⏳"];
const BLOCKED_MARKERS: &[&str] = &["🚫", "⛔", "❌"];
const NOT_STARTED_MARKERS: &[&str] = &["⬜", "🔲"];

/// Checkbox tallies for a span of markdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckboxCounts {
    pub checked: u32,
    pub unchecked: u32,
    /// Unchecked items carrying an in-progress marker
    pub in_progress: u32,
    /// Unchecked items carrying a blocked marker
    pub blocked: u32,
}

impl CheckboxCounts {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.checked + self.unchecked
    }

    /// Status implied by the counts.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        match (self.total(), self.checked) {
            (0, _) => TaskStatus::Pending,
            (total, checked) if checked == total => TaskStatus::Completed,
            (_, 0) => TaskStatus::Pending,
            _ => TaskStatus::InProgress,
        }
    }

    fn add(&mut self, mark: Mark) {
        match mark {
            Mark::Checked => self.checked += 1,
            Mark::Unchecked => self.unchecked += 1,
            Mark::InProgress => {
                self.unchecked += 1;
                self.in_progress += 1;
            }
            Mark::Blocked => {
                self.unchecked += 1;
                self.blocked += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Checked,
    Unchecked,
    InProgress,
    Blocked,
}

fn checkbox_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*]\s+\[([ xX])\]").expect("valid checkbox regex"))
}

fn parse_mark(line: &str) -> Option<Mark> {
    if let Some(caps) = checkbox_re().captures(line) {
        return Some(if &caps[1] == " " {
            Mark::Unchecked
        } else {
            Mark::Checked
        });
    }

    let trimmed = line.trim_start();
    let item = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map_or(trimmed, str::trim_start);
    let starts_with_any = |markers: &[&str]| markers.iter().any(|m| item.starts_with(m));

    if starts_with_any(COMPLETED_MARKERS) {
        Some(Mark::Checked)
    } else if starts_with_any(IN_PROGRESS_MARKERS) {
        Some(Mark::InProgress)
    } else if starts_with_any(BLOCKED_MARKERS) {
        Some(Mark::Blocked)
    } else if starts_with_any(NOT_STARTED_MARKERS) {
        Some(Mark::Unchecked)
    } else {
        None
    }
}

/// ATX heading level (1-6) and title, if the line is a heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some((level, rest.trim()))
    } else {
        None
    }
}

/// A markdown line with code fences already accounted for.
struct Line<'a> {
    text: &'a str,
    heading: Option<(usize, &'a str)>,
}

fn scan_lines(content: &str) -> Vec<Line<'_>> {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for text in content.lines() {
        let trimmed = text.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        lines.push(Line {
            text,
            heading: heading(text),
        });
    }
    lines
}

fn count_span(lines: &[Line<'_>]) -> CheckboxCounts {
    let mut counts = CheckboxCounts::default();
    for line in lines {
        if line.heading.is_none() {
            if let Some(mark) = parse_mark(line.text) {
                counts.add(mark);
            }
        }
    }
    counts
}

/// Count every checkbox in the document.
#[must_use]
pub fn count_all(content: &str) -> CheckboxCounts {
    count_span(&scan_lines(content))
}

/// Count checkboxes in the highest-priority section that has any, falling
/// back to the whole document.
///
/// A section runs from its heading to the next heading of equal or
/// shallower level.
#[must_use]
pub fn count_checkboxes(content: &str) -> CheckboxCounts {
    let lines = scan_lines(content);

    for keyword in PRIORITY_SECTIONS {
        for (start, line) in lines.iter().enumerate() {
            let Some((level, title)) = line.heading else {
                continue;
            };
            if !title.to_lowercase().contains(keyword) {
                continue;
            }
            let end = lines[start + 1..]
                .iter()
                .position(|l| l.heading.is_some_and(|(lvl, _)| lvl <= level))
                .map_or(lines.len(), |offset| start + 1 + offset);
            let counts = count_span(&lines[start + 1..end]);
            if counts.total() > 0 {
                return counts;
            }
        }
    }

    count_span(&lines)
}

/// Status implied by a document's checkboxes.
#[must_use]
pub fn status_from_content(content: &str) -> TaskStatus {
    count_checkboxes(content).status()
}
