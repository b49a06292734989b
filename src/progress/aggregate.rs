//! Hierarchical progress aggregation.
//!
//! ```text
//! festival/
//!   01_kickoff.md              <- counted at festival level
//!   001_PLAN/                  <- phase (three digits + "_")
//!     01_scope.md              <- counted at phase level
//!     01_research/             <- sequence (two digits + "_")
//!       01_survey.md           <- counted in the sequence
//!       02_code_review.md      <- gate, counted like a task
//!       SEQUENCE_GOAL.md       <- goal, never counted
//!     notes/
//!       01_spike.md            <- counted at phase level
//! ```
//!
//! Each scope's snapshot is built from its own tracked files plus the
//! snapshots of its children. Files in subdirectories that are not child
//! scopes belong to the nearest enclosing scope. Dot directories and ignored
//! paths are skipped, as in [`TreeWalker`]. Output order follows directory
//! names.

use std::path::Path;

use serde::Serialize;

use super::record::TaskStatus;
use super::status::status_from_file;
use super::store::ProgressStore;
use super::task_id::task_id_for_path;
use super::time::time_for_record;
use crate::cancel::CancelToken;
use crate::classify::{self, is_phase_dir, is_sequence_dir};
use crate::error::{FestError, Result};
use crate::fs::{list_dir, Entry, FileStat, TreeWalker};

// ============================================================================
// Snapshot Types
// ============================================================================

/// A recorded blocker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub task_id: String,
    pub blocker_message: String,
}

/// Aggregated counts for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub pending: u32,
    /// Tasks displayed as blocked; each is also counted in its status bucket
    pub blocked: u32,
    pub percentage: u32,
    pub time_spent_minutes: i64,
    pub blockers: Vec<Blocker>,
}

impl ProgressSnapshot {
    fn record(&mut self, task: ResolvedTask) {
        self.total += 1;
        match task.status {
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::InProgress | TaskStatus::Blocked => self.in_progress += 1,
            TaskStatus::Pending => self.pending += 1,
        }
        if task.displayed_blocked {
            self.blocked += 1;
        }
        self.time_spent_minutes += task.minutes;
        if let Some(message) = task.blocker_message {
            self.blockers.push(Blocker {
                task_id: task.task_id,
                blocker_message: message,
            });
        }
    }

    fn merge(&mut self, other: &ProgressSnapshot) {
        self.total += other.total;
        self.completed += other.completed;
        self.in_progress += other.in_progress;
        self.pending += other.pending;
        self.blocked += other.blocked;
        self.time_spent_minutes += other.time_spent_minutes;
        self.blockers.extend(other.blockers.iter().cloned());
    }

    fn finish(mut self) -> Self {
        self.percentage = if self.total > 0 {
            self.completed * 100 / self.total
        } else {
            0
        };
        self.blockers.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        self
    }

    /// Whether every tracked task is completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Progress of one sequence directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceProgress {
    pub name: String,
    /// Path relative to the festival root
    pub path: String,
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
}

/// Progress of one phase directory, with its sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub name: String,
    pub path: String,
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    pub sequences: Vec<SequenceProgress>,
}

/// Progress of a whole festival, with per-phase breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FestivalProgress {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    pub phases: Vec<PhaseProgress>,
}

// ============================================================================
// Aggregator
// ============================================================================

struct ResolvedTask {
    task_id: String,
    status: TaskStatus,
    displayed_blocked: bool,
    minutes: i64,
    blocker_message: Option<String>,
}

/// Read-only walker that turns a festival tree into snapshots.
pub struct Aggregator<'a> {
    root: &'a Path,
    walker: &'a TreeWalker,
    store: &'a ProgressStore,
    stat: &'a dyn FileStat,
    cancel: &'a CancelToken,
}

impl<'a> Aggregator<'a> {
    /// Aggregate the festival rooted at the walker's root.
    pub fn new(
        walker: &'a TreeWalker,
        store: &'a ProgressStore,
        stat: &'a dyn FileStat,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            root: walker.root(),
            walker,
            store,
            stat,
            cancel,
        }
    }

    /// Snapshot of the whole festival.
    pub fn festival(&self) -> Result<FestivalProgress> {
        self.cancel.check("festival progress")?;
        let entries = self.list_root()?;

        let mut snapshot = self.own_files(&entries, Some(is_phase_dir));
        let mut phases = Vec::new();
        for entry in entries.iter().filter(|e| e.is_dir && is_phase_dir(&e.name)) {
            let phase = self.phase_at(entry)?;
            snapshot.merge(&phase.snapshot);
            phases.push(phase);
        }

        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FestivalProgress {
            name,
            snapshot: snapshot.finish(),
            phases,
        })
    }

    /// Snapshot of one phase, selected by full name or numeric prefix.
    pub fn phase(&self, phase: &str) -> Result<PhaseProgress> {
        let entries = self.list_root()?;
        let entry = find_dir(&entries, phase, is_phase_dir)
            .ok_or_else(|| FestError::not_found("phase", self.root.join(phase)))?;
        self.phase_at(entry)
    }

    /// Snapshot of one sequence within a phase.
    pub fn sequence(&self, phase: &str, sequence: &str) -> Result<SequenceProgress> {
        let entries = self.list_root()?;
        let phase_entry = find_dir(&entries, phase, is_phase_dir)
            .ok_or_else(|| FestError::not_found("phase", self.root.join(phase)))?;
        let phase_entries = self.list(&phase_entry.path)?;
        let entry = find_dir(&phase_entries, sequence, is_sequence_dir)
            .ok_or_else(|| FestError::not_found("sequence", phase_entry.path.join(sequence)))?;
        self.sequence_at(entry)
    }

    fn list_root(&self) -> Result<Vec<Entry>> {
        if !self.root.is_dir() {
            return Err(FestError::not_found("festival root", self.root));
        }
        self.list(self.root)
    }

    fn list(&self, dir: &Path) -> Result<Vec<Entry>> {
        let mut entries = list_dir(dir)?;
        entries.retain(|e| !self.walker.is_ignored(&e.path, e.is_dir));
        Ok(entries)
    }

    fn phase_at(&self, entry: &Entry) -> Result<PhaseProgress> {
        self.cancel.check("phase progress")?;
        let entries = self.list(&entry.path)?;

        let mut snapshot = self.own_files(&entries, Some(is_sequence_dir));
        let mut sequences = Vec::new();
        for child in entries.iter().filter(|e| e.is_dir && is_sequence_dir(&e.name)) {
            let sequence = self.sequence_at(child)?;
            snapshot.merge(&sequence.snapshot);
            sequences.push(sequence);
        }

        Ok(PhaseProgress {
            name: entry.name.clone(),
            path: self.relative(&entry.path),
            snapshot: snapshot.finish(),
            sequences,
        })
    }

    fn sequence_at(&self, entry: &Entry) -> Result<SequenceProgress> {
        self.cancel.check("sequence progress")?;
        let entries = self.list(&entry.path)?;
        Ok(SequenceProgress {
            name: entry.name.clone(),
            path: self.relative(&entry.path),
            snapshot: self.own_files(&entries, None).finish(),
        })
    }

    /// Tracked files owned by a scope: its direct files plus everything in
    /// subdirectories that are not child scopes.
    fn own_files(
        &self,
        entries: &[Entry],
        child_scope: Option<fn(&str) -> bool>,
    ) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot::default();
        for entry in entries {
            if !entry.is_dir {
                if classify::is_tracked(&entry.name) {
                    snapshot.record(self.resolve(&entry.path));
                }
            } else if !child_scope.is_some_and(|is_scope| is_scope(&entry.name)) {
                for file in self.walker.tracked_files_in(&entry.path) {
                    snapshot.record(self.resolve(&file));
                }
            }
        }
        snapshot
    }

    fn resolve(&self, path: &Path) -> ResolvedTask {
        let task_id = self.relative(path);
        match self.store.get_task_progress(&task_id) {
            Some((record, _)) => {
                let status = record.status.unwrap_or_else(|| status_from_file(path));
                ResolvedTask {
                    status,
                    displayed_blocked: record.has_blocker() || status == TaskStatus::Blocked,
                    minutes: time_for_record(record, path, self.stat),
                    blocker_message: record
                        .has_blocker()
                        .then(|| record.blocker_message.clone().unwrap_or_default()),
                    task_id,
                }
            }
            None => ResolvedTask {
                status: status_from_file(path),
                displayed_blocked: false,
                minutes: 0,
                blocker_message: None,
                task_id,
            },
        }
    }

    fn relative(&self, path: &Path) -> String {
        task_id_for_path(self.root, path)
    }
}

/// Find a phase or sequence directory by exact name or numeric prefix.
fn find_dir<'e>(
    entries: &'e [Entry],
    wanted: &str,
    is_kind: fn(&str) -> bool,
) -> Option<&'e Entry> {
    let wanted = wanted.trim_end_matches('/');
    let candidates = || {
        entries
            .iter()
            .filter(move |e| e.is_dir && is_kind(&e.name))
    };
    candidates().find(|e| e.name == wanted).or_else(|| {
        candidates().find(|e| {
            e.name
                .split_once('_')
                .is_some_and(|(prefix, _)| prefix == wanted)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FestConfig;
    use crate::fs::DiskStat;
    use crate::progress::record::TaskProgress;
    use tempfile::TempDir;

    fn walker(root: &Path) -> TreeWalker {
        TreeWalker::new(root, &FestConfig::default()).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn festival() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "FESTIVAL_OVERVIEW.md", "# Overview\n- [ ] not counted\n");
        write(root, "01_kickoff.md", "- [x] done\n");
        write(root, "001_PLAN/PHASE_GOAL.md", "");
        write(root, "001_PLAN/01_research/SEQUENCE_GOAL.md", "");
        write(root, "001_PLAN/01_research/01_survey.md", "- [x] a\n- [x] b\n");
        write(root, "001_PLAN/01_research/02_notes.md", "- [x] a\n- [ ] b\n");
        write(root, "001_PLAN/01_research/03_code_review.md", "- [ ] review\n");
        write(root, "001_PLAN/01_research/README.md", "- [x] ignored\n");
        write(root, "002_BUILD/01_core/01_parser.md", "");
        write(root, "002_BUILD/01_core/02_commit.md", "");
        write(root, "002_BUILD/02_cli/01_args.md", "- [x] x\n");
        write(root, "002_BUILD/03_scope.md", "");
        write(root, "002_BUILD/notes/01_spike.md", "");
        write(root, "002_BUILD/.drafts/01_hidden.md", "- [x] x\n");
        temp
    }

    fn assert_partition(snapshot: &ProgressSnapshot) {
        assert_eq!(
            snapshot.completed + snapshot.in_progress + snapshot.pending,
            snapshot.total
        );
    }

    #[test]
    fn test_festival_rollup_from_content() {
        let temp = festival();
        let store = ProgressStore::new(temp.path().join(".fest/progress.json"));
        let cancel = CancelToken::new();
        let walker = walker(temp.path());
        let progress = Aggregator::new(&walker, &store, &DiskStat, &cancel)
            .festival()
            .unwrap();

        assert_eq!(progress.snapshot.total, 9);
        assert_eq!(progress.snapshot.completed, 3);
        assert_eq!(progress.snapshot.in_progress, 1);
        assert_eq!(progress.snapshot.pending, 5);
        assert_eq!(progress.snapshot.percentage, 33);
        assert_partition(&progress.snapshot);

        let names: Vec<&str> = progress.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["001_PLAN", "002_BUILD"]);

        let build = &progress.phases[1];
        assert_eq!(build.snapshot.total, 5);
        assert_eq!(build.sequences.len(), 2);
        assert_eq!(build.sequences[0].path, "002_BUILD/01_core");
        for phase in &progress.phases {
            assert_partition(&phase.snapshot);
            for sequence in &phase.sequences {
                assert_partition(&sequence.snapshot);
            }
        }
    }

    #[test]
    fn test_stored_state_and_blockers() {
        let temp = festival();
        let mut store = ProgressStore::new(temp.path().join(".fest/progress.json"));

        let mut parser = TaskProgress::new("002_BUILD/01_core/01_parser.md");
        parser.status = Some(TaskStatus::InProgress);
        parser.blocker_message = Some("grammar undecided".to_string());
        parser.time_spent_minutes = Some(30);
        store.set_task(parser);

        let mut commit = TaskProgress::new("002_BUILD/01_core/02_commit.md");
        commit.status = Some(TaskStatus::Completed);
        commit.time_spent_minutes = Some(5);
        store.set_task(commit);

        let mut outside = TaskProgress::new("002_BUILD/02_cli/01_args.md");
        outside.blocker_message = Some("other sequence".to_string());
        store.set_task(outside);

        let cancel = CancelToken::new();
        let walker = walker(temp.path());
        let aggregator = Aggregator::new(&walker, &store, &DiskStat, &cancel);
        let core = aggregator.sequence("002_BUILD", "01_core").unwrap();

        assert_eq!(core.snapshot.total, 2);
        assert_eq!(core.snapshot.completed, 1);
        assert_eq!(core.snapshot.in_progress, 1);
        assert_eq!(core.snapshot.blocked, 1);
        assert_eq!(core.snapshot.percentage, 50);
        assert_eq!(core.snapshot.time_spent_minutes, 35);
        assert_eq!(
            core.snapshot.blockers,
            vec![Blocker {
                task_id: "002_BUILD/01_core/01_parser.md".to_string(),
                blocker_message: "grammar undecided".to_string(),
            }]
        );
        assert_partition(&core.snapshot);

        // A blocker-only record keeps the status from its checkboxes.
        let cli = aggregator.sequence("002_BUILD", "02_cli").unwrap();
        assert_eq!(cli.snapshot.completed, 1);
        assert_eq!(cli.snapshot.blocked, 1);

        let phase = aggregator.phase("002").unwrap();
        assert_eq!(phase.snapshot.blockers.len(), 2);
        assert_eq!(phase.snapshot.blocked, 2);
        assert_eq!(phase.snapshot.time_spent_minutes, 35);
    }

    #[test]
    fn test_stored_blocked_status_stays_in_progress_bucket() {
        let temp = festival();
        let mut store = ProgressStore::new(temp.path().join(".fest/progress.json"));
        let mut legacy = TaskProgress::new("002_BUILD/02_cli/01_args.md");
        legacy.status = Some(TaskStatus::Blocked);
        store.set_task(legacy);

        let cancel = CancelToken::new();
        let walker = walker(temp.path());
        let cli = Aggregator::new(&walker, &store, &DiskStat, &cancel)
            .sequence("002_BUILD", "02_cli")
            .unwrap();
        assert_eq!(cli.snapshot.in_progress, 1);
        assert_eq!(cli.snapshot.blocked, 1);
        assert!(cli.snapshot.blockers.is_empty());
        assert_partition(&cli.snapshot);
    }

    #[test]
    fn test_unknown_scope_is_not_found() {
        let temp = festival();
        let store = ProgressStore::new(temp.path().join(".fest/progress.json"));
        let cancel = CancelToken::new();
        let walker = walker(temp.path());
        let aggregator = Aggregator::new(&walker, &store, &DiskStat, &cancel);

        assert!(matches!(
            aggregator.phase("009_MISSING"),
            Err(FestError::NotFound { .. })
        ));
        assert!(matches!(
            aggregator.sequence("001_PLAN", "07_none"),
            Err(FestError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("gone");
        let store = ProgressStore::new(root.join(".fest/progress.json"));
        let cancel = CancelToken::new();
        assert!(matches!(
            Aggregator::new(&walker(&root), &store, &DiskStat, &cancel).festival(),
            Err(FestError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_festival_has_zero_percentage() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().join(".fest/progress.json"));
        let cancel = CancelToken::new();
        let walker = walker(temp.path());
        let progress = Aggregator::new(&walker, &store, &DiskStat, &cancel)
            .festival()
            .unwrap();
        assert_eq!(progress.snapshot.total, 0);
        assert_eq!(progress.snapshot.percentage, 0);
        assert!(!progress.snapshot.is_complete());
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = festival();
        let store = ProgressStore::new(temp.path().join(".fest/progress.json"));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            Aggregator::new(&walker(temp.path()), &store, &DiskStat, &cancel).festival(),
            Err(FestError::Cancelled { .. })
        ));
    }

    #[test]
    fn test_nested_files_belong_to_enclosing_scope() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "docs/01_readme_task.md", "- [x] x\n");
        write(root, "001_PLAN/01_s/01_a.md", "");
        write(root, "001_PLAN/01_s/extra/02_b.md", "- [x] x\n");
        write(root, "001_PLAN/archive/01_old.md", "- [x] x\n");
        let store = ProgressStore::new(root.join(".fest/progress.json"));
        let cancel = CancelToken::new();

        let config = FestConfig {
            ignore: vec!["001_PLAN/archive".to_string()],
            ..FestConfig::default()
        };
        let walker = TreeWalker::new(root, &config).unwrap();
        let progress = Aggregator::new(&walker, &store, &DiskStat, &cancel)
            .festival()
            .unwrap();

        assert_eq!(progress.snapshot.total, 3);
        assert_eq!(progress.snapshot.completed, 2);
        let plan = &progress.phases[0];
        assert_eq!(plan.snapshot.total, 2);
        assert_eq!(plan.sequences[0].snapshot.total, 2);
        assert_eq!(plan.sequences[0].snapshot.completed, 1);
        assert_eq!(walker.tracked_files().len(), progress.snapshot.total as usize);
    }

    #[test]
    fn test_find_dir_by_prefix() {
        let entries = vec![
            Entry {
                path: "/f/001_PLAN".into(),
                name: "001_PLAN".to_string(),
                is_dir: true,
            },
            Entry {
                path: "/f/01_kickoff.md".into(),
                name: "01_kickoff.md".to_string(),
                is_dir: false,
            },
        ];
        assert!(find_dir(&entries, "001", is_phase_dir).is_some());
        assert!(find_dir(&entries, "001_PLAN/", is_phase_dir).is_some());
        assert!(find_dir(&entries, "01", is_sequence_dir).is_none());
    }
}
