//! Criterion benchmarks for whole-tree reconciliation.
//!
//! Trees are seeded so runs are comparable; every level is materialized
//! before measuring, which is the worst case for a pass.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lazytree::{Address, ManualScheduler, MemorySource, TreeModel};
use lazytree_testkit::{apply, random_tree, Mutation};

const TREE_SIZES: &[usize] = &[100, 1_000, 10_000];

fn load_everything(model: &TreeModel<MemorySource>, parent: Address) {
    for row in 0..model.row_count(parent) {
        if let Some(child) = model.index(row, parent) {
            load_everything(model, child);
        }
    }
}

fn loaded_model(size: usize) -> TreeModel<MemorySource> {
    let model = TreeModel::new(random_tree(0x5eed, size), Rc::new(ManualScheduler::new()));
    load_everything(&model, Address::Root);
    model
}

/// A pass over an unchanged, fully loaded tree.
fn benchmark_noop_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_noop");
    group.sample_size(20);

    for &size in TREE_SIZES {
        let model = loaded_model(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(model.sync_tree()));
        });
    }
    group.finish();
}

/// A pass after one removal and one insertion.
fn benchmark_small_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_small_edit");
    group.sample_size(20);

    for &size in TREE_SIZES {
        let model = loaded_model(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                apply(model.source(), &Mutation::Remove { target: 0 });
                apply(
                    model.source(),
                    &Mutation::Insert {
                        parent: usize::MAX,
                        index: 0,
                        label: "fresh".into(),
                    },
                );
                black_box(model.sync_tree())
            });
        });
    }
    group.finish();
}

/// Materializing a fresh tree level by level.
fn benchmark_full_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_load");
    group.sample_size(10);

    for &size in TREE_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_with_setup(
                || TreeModel::new(random_tree(0x5eed, size), Rc::new(ManualScheduler::new())),
                |model| {
                    load_everything(&model, Address::Root);
                    black_box(model.cached_nodes())
                },
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_noop_pass,
    benchmark_small_edit,
    benchmark_full_load
);
criterion_main!(benches);
