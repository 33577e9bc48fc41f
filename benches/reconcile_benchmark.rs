//! Benchmark for reconciling large region sets.
//!
//! Measures the plan computation against a store that already holds every
//! region (the common incremental case) and a full first materialization.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use orikomi::folding::{
    ApplyDefaultStateMode, FoldReconciler, FoldRegionStore, FoldingGroup, RegionInfo,
};
use orikomi::syntax::ByteRange;
use std::hint::black_box;

/// `count` sibling regions of 40 bytes, each containing one nested region.
/// Every tenth pair shares a group.
fn generate_infos(count: usize) -> (Vec<RegionInfo>, usize) {
    let mut infos = Vec::with_capacity(count * 2);
    for i in 0..count {
        let start = i * 50;
        let group = (i % 10 == 0).then(FoldingGroup::new);
        let mut outer = RegionInfo::new(ByteRange::new(start, start + 40), "{...}")
            .with_signature(format!("e#{},{},0", start, start + 40));
        let mut inner = RegionInfo::new(ByteRange::new(start + 10, start + 30), "(...)")
            .with_signature(format!("e#{},{},0", start + 10, start + 30));
        if let Some(group) = group {
            outer = outer.with_group(group);
            inner = inner.with_group(group);
        }
        infos.push(outer);
        infos.push(inner);
    }
    (infos, count * 50)
}

fn benchmark_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for count in [100, 1_000, 5_000] {
        let (infos, len) = generate_infos(count);

        group.bench_with_input(BenchmarkId::new("first_pass", count), &infos, |b, infos| {
            b.iter(|| {
                let mut store = FoldRegionStore::new(len, 1);
                FoldReconciler::reconcile(
                    &mut store,
                    black_box(infos),
                    ApplyDefaultStateMode::Always,
                    true,
                    None,
                )
            });
        });

        let mut store = FoldRegionStore::new(len, 1);
        FoldReconciler::reconcile(&mut store, &infos, ApplyDefaultStateMode::Always, true, None);
        group.bench_with_input(BenchmarkId::new("unchanged_plan", count), &infos, |b, infos| {
            b.iter(|| {
                FoldReconciler::compute_plan(
                    &store,
                    black_box(infos),
                    ApplyDefaultStateMode::Never,
                    true,
                    None,
                    len,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_reconcile);
criterion_main!(benches);
