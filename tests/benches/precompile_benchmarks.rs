//! # Quantum-Chain Precompile Benchmarks
//!
//! | Stage | Claim | Target |
//! |-------|-------|--------|
//! | Resolve | O(V + E) post-order | < 1ms for 1k units |
//! | Cold build | One compile per unit | Linear in total bytecode |
//! | Warm build | Session cache hit per unit | No compiler calls |
//! | Populate | Patch open slots only | < 10us |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qc_precompile::prelude::*;
use qc_tests::benchmarks::precompile::{chain, layered, seeds};
use std::time::Duration;

// ============================================================================
// Dependency resolution
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-precompile-resolve");
    group.measurement_time(Duration::from_secs(5));

    let engine = PrecompileEngine::new(LineAssembler::new());
    for depth in [8usize, 32, 63] {
        let graph = chain(depth);
        let root = format!("U{depth}");
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::new("chain", depth), &graph, |b, graph| {
            b.iter(|| black_box(engine.plan(graph, &root).unwrap()));
        });
    }

    for width in [4usize, 16, 32] {
        let graph = layered(4, width);
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::new("layered", width), &graph, |b, graph| {
            b.iter(|| black_box(engine.plan(graph, "Root").unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Full builds
// ============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-precompile-build");
    group.measurement_time(Duration::from_secs(10));

    let bindings = seeds(0x5A);
    for width in [2usize, 4, 8] {
        let graph = layered(3, width);
        group.throughput(Throughput::Elements(graph.len() as u64));

        let sequential = PrecompileEngine::new(LineAssembler::new());
        group.bench_with_input(BenchmarkId::new("cold_sequential", width), &graph, |b, graph| {
            b.iter(|| black_box(sequential.build(graph, "Root", &bindings).unwrap()));
        });

        let parallel = PrecompileEngine::with_config(
            LineAssembler::new(),
            PrecompileConfig {
                parallel: true,
                ..PrecompileConfig::default()
            },
        );
        group.bench_with_input(BenchmarkId::new("cold_parallel", width), &graph, |b, graph| {
            b.iter(|| black_box(parallel.build(graph, "Root", &bindings).unwrap()));
        });

        let session = BuildSession::new();
        sequential
            .build_in_session(&session, &graph, "Root", &bindings)
            .unwrap();
        group.bench_with_input(BenchmarkId::new("warm_session", width), &graph, |b, graph| {
            b.iter(|| {
                black_box(
                    sequential
                        .build_in_session(&session, graph, "Root", &bindings)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

// ============================================================================
// Populating templates
// ============================================================================

fn bench_populate(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-precompile-populate");

    let graph = layered(3, 4);
    let engine = PrecompileEngine::new(LineAssembler::new());
    let template = engine
        .build(&graph, "Root", &ExternalBindings::new())
        .unwrap()
        .root;
    let values = seeds(0x01);

    group.throughput(Throughput::Elements(template.open_slots.len() as u64));
    group.bench_function("populate_layered_root", |b| {
        b.iter(|| black_box(template.populate(&values).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_build, bench_populate);
criterion_main!(benches);
