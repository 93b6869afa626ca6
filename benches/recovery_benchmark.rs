//! Benchmark suite for the stack-trace recovery pipeline.
//!
//! Covers the costs that decide whether recovery can stay on by default:
//! - Frame capture at a call site (the per-await overhead when nothing fails)
//! - Marker record/lookup through the sharded store
//! - Full recovery of a stored failure, by frame count and cause depth
//! - Frame filtering with internal-run elision
//!
//! Recovery work happens only on the failure path; capture work happens on
//! every spawn. The capture benchmarks are the ones with a real budget.

#![allow(missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use resurface::config::RecoveryConfig;
use resurface::exception::{ExceptionKind, ExceptionValue};
use resurface::filter::FrameFilter;
use resurface::frame::Frame;
use resurface::marker::{CreationMarker, MarkerStore};
use resurface::recover::RecoveryEngine;
use resurface::task::{TaskId, TaskToken};
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn stored_failure(frame_count: usize) -> ExceptionValue {
    let mut failure =
        ExceptionValue::new(ExceptionKind::from_static("bench::Failure"), "exploded");
    for i in 0..frame_count {
        failure = failure.with_frame(Frame::named(format!("bench::frame_{i}")));
    }
    failure
}

fn failure_with_cause_chain(depth: usize) -> ExceptionValue {
    let mut chain: Option<ExceptionValue> = None;
    for i in (0..depth).rev() {
        let mut link = ExceptionValue::caller_context(
            &format!("hop_{i}"),
            vec![Frame::named(format!("bench::await_{i}"))],
        );
        if let Some(inner) = chain.take() {
            link = link.with_cause(inner);
        }
        chain = Some(link);
    }
    match chain {
        Some(chain) => stored_failure(2).with_cause(chain),
        None => stored_failure(2),
    }
}

fn marker(frame_count: usize) -> CreationMarker {
    let frames = (0..frame_count)
        .map(|i| Frame::named(format!("bench::spawn_{i}")))
        .collect();
    CreationMarker::new("bench_task", frames)
}

// =============================================================================
// CAPTURE PATH (runs on every spawn and await)
// =============================================================================

fn bench_frame_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_capture");

    group.bench_function("here", |b| {
        b.iter(|| black_box(Frame::here("bench::call_site")));
    });

    group.bench_function("named", |b| {
        b.iter(|| black_box(Frame::named("bench::call_site")));
    });

    group.finish();
}

fn bench_marker_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("marker_store");
    let config = RecoveryConfig::default();

    group.bench_function("record", |b| {
        let store = MarkerStore::new(&config);
        let token = Arc::new(TaskToken::new());
        b.iter(|| {
            let id = TaskId::next();
            black_box(store.record(
                id,
                &token,
                "bench_task",
                vec![Frame::named("bench::spawn_site")],
            ));
        });
    });

    group.bench_function("lookup_hit", |b| {
        let store = MarkerStore::new(&config);
        let token = Arc::new(TaskToken::new());
        let id = TaskId::next();
        let _ = store.record(id, &token, "bench_task", Vec::new());
        b.iter(|| black_box(store.lookup(id)));
    });

    group.bench_function("lookup_miss", |b| {
        let store = MarkerStore::new(&config);
        let id = TaskId::next();
        b.iter(|| black_box(store.lookup(id)));
    });

    group.finish();
}

// =============================================================================
// RECOVERY PATH (runs once per observed failure)
// =============================================================================

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");
    let engine = RecoveryEngine::new(RecoveryConfig::default());
    let caller = [Frame::named("bench::await_site")];

    for frame_count in [4, 16, 64] {
        let stored = stored_failure(frame_count);
        let spawn_marker = marker(4);
        group.throughput(Throughput::Elements(frame_count as u64));
        group.bench_with_input(
            BenchmarkId::new("with_marker", frame_count),
            &stored,
            |b, stored| {
                b.iter(|| black_box(engine.recover(stored, Some(&spawn_marker), &caller)));
            },
        );
    }

    let stored = stored_failure(16);
    group.bench_function("without_marker", |b| {
        b.iter(|| black_box(engine.recover(&stored, None, &caller)));
    });

    let disabled = RecoveryEngine::new(RecoveryConfig::disabled());
    group.bench_function("disabled", |b| {
        b.iter(|| black_box(disabled.recover(&stored, None, &caller)));
    });

    group.finish();
}

fn bench_recover_by_cause_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover_cause_depth");
    let engine = RecoveryEngine::new(RecoveryConfig::default());
    let spawn_marker = marker(2);
    let caller = [Frame::named("bench::await_site")];

    for depth in [1, 8, 24] {
        let stored = failure_with_cause_chain(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &stored, |b, stored| {
            b.iter(|| black_box(engine.recover(stored, Some(&spawn_marker), &caller)));
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_filter");
    let filter = FrameFilter::engine_internals();

    let mixed: Vec<Frame> = (0..32)
        .map(|i| {
            if i % 4 == 0 {
                Frame::named(format!("resurface::internal_{i}"))
            } else {
                Frame::named(format!("bench::frame_{i}"))
            }
        })
        .collect();
    let clean: Vec<Frame> = (0..32)
        .map(|i| Frame::named(format!("bench::frame_{i}")))
        .collect();

    group.throughput(Throughput::Elements(32));
    group.bench_function("mixed_runs", |b| {
        b.iter(|| black_box(filter.filter(&mixed)));
    });
    group.bench_function("no_internal_frames", |b| {
        b.iter(|| black_box(filter.filter(&clean)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_capture,
    bench_marker_store,
    bench_recover,
    bench_recover_by_cause_depth,
    bench_filter,
);
criterion_main!(benches);
