//! fest - progress tracking for festival-structured project plans

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

use fest::classify::{classify, name_part};
use fest::config::{FestConfig, OutputConfig};
use fest::progress::{
    BackfillReport, MutationOutcome, PhaseProgress, ProgressManager, ProgressSnapshot,
    SequenceProgress, TaskStatus, TaskView,
};
use fest::FestError;

#[derive(Parser)]
#[command(name = "fest")]
#[command(version)]
#[command(about = "Status, time and progress for festival project plans", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Festival root directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show aggregated progress for the festival, a phase or a sequence
    Progress {
        /// Phase directory name or numeric prefix (e.g. 001_PLAN or 001)
        #[arg(long)]
        phase: Option<String>,

        /// Sequence directory name or numeric prefix within the phase
        #[arg(long, requires = "phase")]
        sequence: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved status, time and blocker of one task
    Status {
        /// Task path relative to the festival root, or a unique file name
        task: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a task in progress
    Start { task: String },

    /// Mark a task completed
    Complete { task: String },

    /// Record a completion percentage (0-100, "%" optional)
    Set {
        task: String,

        #[arg(value_parser = parse_percent)]
        percent: u32,
    },

    /// Attach a blocker message to a task
    Block { task: String, message: String },

    /// Clear a task's blocker
    Unblock { task: String },

    /// Infer missing durations for completed tasks from file timestamps
    Backfill {
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Classify file names as task, gate, goal or unknown
    Classify {
        #[arg(required = true)]
        names: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_percent(raw: &str) -> Result<u32, String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    digits
        .parse::<u32>()
        .map_err(|_| format!("'{raw}' is not a percentage"))
}

fn main() {
    let cli = Cli::parse();

    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());
    let config = FestConfig::load(&project_path);
    let file_output = config
        .as_ref()
        .map(|c| c.output.clone())
        .unwrap_or_default();
    let output = OutputConfig {
        verbose: cli.verbose || file_output.verbose,
        no_color: cli.no_color || file_output.no_color,
    };

    // Initialize tracing
    let filter = if output.verbose { "fest=debug" } else { "fest=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if output.no_color {
        colored::control::set_override(false);
    }

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, project_path, config.with_output(output)));

    if let Err(err) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        let code = err
            .downcast_ref::<FestError>()
            .map_or(1, FestError::exit_code);
        std::process::exit(code);
    }
}

fn run(command: Commands, project_path: PathBuf, config: FestConfig) -> anyhow::Result<()> {
    let open = || ProgressManager::open(&project_path, config);

    match command {
        Commands::Classify { names, json } => print_classification(&names, json)?,

        Commands::Progress {
            phase,
            sequence,
            json,
        } => {
            let manager = open()?;
            match (phase, sequence) {
                (Some(phase), Some(sequence)) => {
                    let progress = manager.sequence_progress(&phase, &sequence)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&progress)?);
                    } else {
                        print_sequence(&progress, 0);
                    }
                }
                (Some(phase), None) => {
                    let progress = manager.phase_progress(&phase)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&progress)?);
                    } else {
                        print_phase(&progress);
                    }
                }
                _ => {
                    let progress = manager.festival_progress()?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&progress)?);
                    } else {
                        println!("\n{} {}", "Festival:".cyan().bold(), progress.name);
                        println!("{}", "─".repeat(50));
                        print_snapshot(&progress.snapshot, 1);
                        for phase in &progress.phases {
                            println!();
                            print_phase(phase);
                        }
                        print_blockers(&progress.snapshot);
                    }
                }
            }
        }

        Commands::Status { task, json } => {
            let view = open()?
                .resolve_task_progress(&task)
                .with_context(|| format!("failed to resolve task '{task}'"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_task(&view);
            }
        }

        Commands::Start { task } => {
            report_mutation(&open()?.mark_in_progress(&task)?, "started");
        }

        Commands::Complete { task } => {
            report_mutation(&open()?.mark_complete(&task)?, "completed");
        }

        Commands::Set { task, percent } => {
            report_mutation(
                &open()?.update_progress(&task, percent)?,
                &format!("set to {percent}%"),
            );
        }

        Commands::Block { task, message } => {
            report_mutation(&open()?.report_blocker(&task, &message)?, "blocked");
        }

        Commands::Unblock { task } => {
            report_mutation(&open()?.clear_blocker(&task)?, "unblocked");
        }

        Commands::Backfill { dry_run } => {
            let report = open()?.backfill_times(dry_run)?;
            print_backfill(&report);
        }
    }

    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn status_label(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Completed => status.as_str().green(),
        TaskStatus::InProgress => status.as_str().yellow(),
        TaskStatus::Blocked => status.as_str().red().bold(),
        TaskStatus::Pending => status.as_str().dimmed(),
    }
}

fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

fn print_snapshot(snapshot: &ProgressSnapshot, indent: usize) {
    let pad = "  ".repeat(indent);
    let percentage = format!("{}%", snapshot.percentage);
    let percentage = if snapshot.is_complete() {
        percentage.green().bold()
    } else {
        percentage.bold()
    };
    println!(
        "{pad}{} ({}/{} completed)",
        percentage, snapshot.completed, snapshot.total
    );
    println!(
        "{pad}In progress: {}  Pending: {}  Blocked: {}",
        snapshot.in_progress, snapshot.pending, snapshot.blocked
    );
    if snapshot.time_spent_minutes > 0 {
        println!("{pad}Time spent: {}", format_minutes(snapshot.time_spent_minutes));
    }
}

fn print_phase(phase: &PhaseProgress) {
    println!("{} {}", "Phase:".cyan().bold(), phase.name);
    print_snapshot(&phase.snapshot, 1);
    for sequence in &phase.sequences {
        print_sequence(sequence, 1);
    }
}

fn print_sequence(sequence: &SequenceProgress, indent: usize) {
    let pad = "  ".repeat(indent);
    println!("{pad}{} {}", "Sequence:".blue(), sequence.name);
    print_snapshot(&sequence.snapshot, indent + 1);
}

fn print_blockers(snapshot: &ProgressSnapshot) {
    if snapshot.blockers.is_empty() {
        return;
    }
    println!("\n{}", "Blockers:".red().bold());
    for blocker in &snapshot.blockers {
        println!("   {} {}", blocker.task_id.bold(), blocker.blocker_message);
    }
}

fn print_task(view: &TaskView) {
    let record = &view.record;
    println!("\n{} {}", "Task:".cyan().bold(), view.task_id);
    println!("{}", "─".repeat(50));
    println!("   Status: {}", status_label(view.display_status));
    if !view.tracked {
        println!("   {}", "(derived from document checkboxes)".dimmed());
    }
    println!("   Progress: {}%", record.progress);
    if let Some(minutes) = record.time_spent_minutes {
        println!("   Time spent: {}", format_minutes(minutes));
    }
    if let Some(started) = record.started_at {
        println!("   Started: {}", started.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(completed) = record.completed_at {
        println!("   Completed: {}", completed.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(message) = record.blocker_message.as_deref().filter(|_| record.has_blocker()) {
        println!("   {} {}", "Blocker:".red().bold(), message);
    }
}

fn report_mutation(outcome: &MutationOutcome, verb: &str) {
    let task_id = &outcome.record.task_id;
    if outcome.changed {
        println!("{} {} {}", "OK".green().bold(), task_id, verb);
    } else {
        println!("{} {} unchanged", "OK".green(), task_id);
    }
}

fn print_backfill(report: &BackfillReport) {
    let heading = if report.dry_run {
        "Backfill (dry run):"
    } else {
        "Backfill:"
    };
    println!("\n{}", heading.cyan().bold());
    for task in &report.updated {
        println!("   {} {}", task.task_id, format_minutes(task.minutes));
    }
    println!(
        "   Updated: {}  Already timed: {}  No signal: {}",
        report.updated.len(),
        report.skipped_has_time,
        report.skipped_no_signal
    );
}

fn print_classification(names: &[String], json: bool) -> anyhow::Result<()> {
    if json {
        let rows: Vec<serde_json::Value> = names
            .iter()
            .map(|name| {
                let file_type = classify(name);
                serde_json::json!({
                    "name": name,
                    "type": file_type.to_string(),
                    "tracked": file_type.is_tracked(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for name in names {
        let file_type = classify(name);
        let label = file_type.to_string();
        let label = if file_type.is_tracked() {
            label.green()
        } else {
            label.dimmed()
        };
        if file_type.is_tracked() {
            println!("{:<40} {} ({})", name, label, name_part(name));
        } else {
            println!("{:<40} {}", name, label);
        }
    }
    Ok(())
}
