//! Transform store benchmarks.
//!
//! Tracks the costs the simulation loop actually pays: registering
//! transforms, the eager subtree recomputation triggered by mutating a node
//! with many descendants, and snapshot capture for the persistence layer.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use glam::{Quat, Vec3};
use vesper_ecs::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A store with `count` root transforms.
fn flat_store(count: usize) -> (EntityAllocator, TransformStore, Vec<Entity>) {
    let mut alloc = EntityAllocator::new();
    let mut store = TransformStore::new();
    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let e = alloc.create().unwrap();
        store
            .add(e, Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        entities.push(e);
    }
    (alloc, store, entities)
}

/// A store with one root and a linear chain of `depth` descendants.
fn chain_store(depth: usize) -> (TransformStore, Entity) {
    let mut alloc = EntityAllocator::new();
    let mut store = TransformStore::new();
    let root = alloc.create().unwrap();
    store
        .add(root, Vec3::ONE, Quat::IDENTITY, Vec3::ONE)
        .unwrap();
    let mut parent = root;
    for _ in 0..depth {
        let child = alloc.create().unwrap();
        store
            .add(child, Vec3::ONE, Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store.add_child(parent, child).unwrap();
        parent = child;
    }
    (store, root)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_add");
    for count in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (_alloc, store, _entities) = flat_store(count);
                black_box(store.len())
            });
        });
    }
    group.finish();
}

fn bench_deep_chain_mutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_position_deep_chain");
    for depth in [64usize, 1_024] {
        let (mut store, root) = chain_store(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut x = 0.0f32;
            b.iter(|| {
                x += 1.0;
                // Every iteration recomputes the entire chain below the root.
                store
                    .get_mut(root)
                    .unwrap()
                    .set_position(Vec3::new(x, 0.0, 0.0));
                black_box(store.get(root).unwrap().world_matrix())
            });
        });
    }
    group.finish();
}

fn bench_world_matrix_reads(c: &mut Criterion) {
    let (_alloc, store, entities) = flat_store(10_000);
    c.bench_function("world_matrix_read_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &e in &entities {
                sum += store.get(e).unwrap().world_matrix().w_axis.x;
            }
            black_box(sum)
        });
    });
}

fn bench_snapshot_capture(c: &mut Criterion) {
    let (_alloc, store, _entities) = flat_store(10_000);
    c.bench_function("snapshot_capture_10k", |b| {
        b.iter(|| black_box(store.capture_snapshot()));
    });
}

criterion_group!(
    benches,
    bench_add,
    bench_deep_chain_mutation,
    bench_world_matrix_reads,
    bench_snapshot_capture
);
criterion_main!(benches);
