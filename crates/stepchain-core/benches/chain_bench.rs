//! # Chain Benchmarks
//!
//! Performance benchmarks for stepchain-core stage handoff.
//!
//! Run with: `cargo bench -p stepchain-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use stepchain_core::{PausedPromise, Promise};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime")
}

/// Build an eager chain of `len` increment stages.
fn eager_chain(len: usize) -> Promise<u64, String> {
    let mut promise = Promise::resolve(0);
    for _ in 0..len {
        promise = promise.then(|v| v + 1);
    }
    promise
}

/// Build a paused chain of `len` increment stages.
fn paused_chain(len: usize) -> PausedPromise<u64, String> {
    let mut promise = PausedPromise::paused(0);
    for _ in 0..len {
        promise = promise.then(|v| v + 1);
    }
    promise
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_eager_chain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("eager_chain");

    for len in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            b.to_async(&rt)
                .iter(|| async move { black_box(eager_chain(len).settle().await) });
        });
    }

    group.finish();
}

fn bench_allocated_chain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("allocated_chain");

    for len in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            b.to_async(&rt).iter(|| async move {
                let chain = paused_chain(len);
                chain.allocate(len).expect("exact allocation");
                black_box(chain.settle().await)
            });
        });
    }

    group.finish();
}

fn bench_resumed_chain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("resumed_chain");

    for len in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            b.to_async(&rt)
                .iter(|| async move { black_box(paused_chain(len).resume().settle().await) });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_eager_chain,
    bench_allocated_chain,
    bench_resumed_chain
);
criterion_main!(benches);
