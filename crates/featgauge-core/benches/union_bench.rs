//! # Reconcile Benchmarks
//!
//! Cost of the full rescan for growing clusters.
//!
//! Run with: `cargo bench -p featgauge-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use featgauge_core::{
    FeatureName, FeatureUnion, MemoryRegistry, MemoryReportStore, NodeName, ReconcileContext,
    Reconciler, Report,
};
use std::hint::black_box;

const FEATURES: &[&str] = &[
    "ipv4", "ipv6", "bond", "vlan", "vrf", "lldp", "ovs-bridge", "dhcpv4", "dhcpv6", "mac-vtap",
];

/// One report per node, each listing a rotating window of features.
fn create_reports(nodes: usize) -> Vec<Report> {
    (0..nodes)
        .map(|i| {
            let features = (0..4)
                .map(|k| FeatureName::new(FEATURES[(i + k) % FEATURES.len()]))
                .collect();
            Report::new(NodeName::new(format!("node-{}", i)), features)
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_union");

    for size in [10, 100, 1000, 5000] {
        let reports = create_reports(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &reports, |b, reports| {
            b.iter(|| FeatureUnion::compute(black_box(reports)));
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [10, 100, 1000] {
        let store = MemoryReportStore::with_reports(create_reports(size));
        let registry = MemoryRegistry::new();
        let ctx = ReconcileContext::new();
        let mut reconciler = Reconciler::new();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                reconciler
                    .reconcile(&ctx, black_box(&store), &registry)
                    .expect("reconcile")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_union, bench_reconcile);
criterion_main!(benches);
