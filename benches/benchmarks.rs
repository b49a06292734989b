//! Benchmark suite for fest.
//!
//! - File name classification
//! - Checkbox scanning of task documents
//! - Festival aggregation over generated trees
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench -- --save-baseline main
//! cargo bench -- --baseline main
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fest::cancel::CancelToken;
use fest::config::FestConfig;
use fest::fs::{DiskStat, TreeWalker};
use fest::progress::{count_checkboxes, Aggregator, ProgressStore};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Classification Benchmarks
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let names = [
        "01_design.md",
        "04_testing_and_verify.md",
        "07_commit.md",
        "01_commit_changes.md",
        "SEQUENCE_GOAL.md",
        "README.md",
        "12_code_review_followups.md",
        "03.notes.md",
    ];

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(names.len() as u64));
    group.bench_function("mixed_names", |b| {
        b.iter(|| {
            for name in &names {
                black_box(fest::classify(black_box(name)));
            }
        });
    });
    group.finish();
}

// ============================================================================
// Checkbox Benchmarks
// ============================================================================

fn task_document(items: usize) -> String {
    let mut doc = String::from("# Task\n\n## Notes\n- [ ] stray idea\n\n## Definition of Done\n");
    for i in 0..items {
        let mark = if i % 3 == 0 { " " } else { "x" };
        doc.push_str(&format!("- [{mark}] item {i}\n"));
    }
    doc.push_str("\n```markdown\n- [ ] example in a fence\n```\n");
    doc
}

fn bench_checkboxes(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_checkboxes");
    for items in [10, 100, 1000] {
        let doc = task_document(items);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &doc, |b, doc| {
            b.iter(|| black_box(count_checkboxes(black_box(doc))));
        });
    }
    group.finish();
}

// ============================================================================
// Aggregation Benchmarks
// ============================================================================

/// Create a festival with `phases` phases of four sequences, each holding
/// five tasks and a gate.
fn create_festival(phases: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for p in 1..=phases {
        for s in 1..=4 {
            let dir = temp_dir
                .path()
                .join(format!("{p:03}_PHASE"))
                .join(format!("{s:02}_seq"));
            fs::create_dir_all(&dir).expect("Failed to create sequence dir");
            fs::write(dir.join("SEQUENCE_GOAL.md"), "# Goal\n").expect("Failed to write goal");
            for t in 1..=5 {
                fs::write(dir.join(format!("{t:02}_task.md")), task_document(8))
                    .expect("Failed to write task");
            }
            fs::write(dir.join("06_testing_and_verify.md"), "- [ ] verify\n")
                .expect("Failed to write gate");
        }
    }
    temp_dir
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("festival_progress");
    group.sample_size(20);

    for phases in [1, 5, 10] {
        let temp_dir = create_festival(phases);
        let store = ProgressStore::new(temp_dir.path().join(".fest/progress.json"));
        let walker = TreeWalker::new(temp_dir.path(), &FestConfig::default())
            .expect("Failed to build walker");
        let cancel = CancelToken::new();

        group.throughput(Throughput::Elements((phases * 4 * 6) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(phases), &walker, |b, walker| {
            b.iter(|| {
                let aggregator = Aggregator::new(walker, &store, &DiskStat, &cancel);
                black_box(aggregator.festival())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_checkboxes, bench_aggregation);
criterion_main!(benches);
