//! Criterion micro-benchmarks for arena acquire/release and re-initialization.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use minibatch_arena::{ArenaConfig, ScopedVector, SystemPool, TempVectorArena};
use minibatch_core::MINI_BATCH_LENGTH;

/// Typical per-batch working set: a selection vector, a byte mask and a bitmap.
fn batch_sizes() -> [usize; 3] {
    [MINI_BATCH_LENGTH * 2, MINI_BATCH_LENGTH, MINI_BATCH_LENGTH / 8]
}

fn bench_scoped_vector(c: &mut Criterion) {
    let pool = SystemPool::new();
    let arena =
        TempVectorArena::with_config(&pool, ArenaConfig::for_allocations(&batch_sizes())).unwrap();

    c.bench_function("scoped_vector_acquire_release", |b| {
        b.iter(|| {
            let v = ScopedVector::<u16>::new(&arena, black_box(MINI_BATCH_LENGTH));
            black_box(v.len())
        });
    });

    c.bench_function("scoped_vector_batch_working_set", |b| {
        b.iter(|| {
            let mut sel = ScopedVector::<u16>::new(&arena, MINI_BATCH_LENGTH);
            let mut mask = ScopedVector::<u8>::new(&arena, MINI_BATCH_LENGTH);
            let mut bits = ScopedVector::<u8>::new(&arena, MINI_BATCH_LENGTH / 8);
            sel[0] = 1;
            mask[0] = 1;
            bits[0] = 1;
            black_box((sel[0], mask[0], bits[0]))
        });
    });
}

fn bench_init(c: &mut Criterion) {
    let pool = SystemPool::new();
    let mut group = c.benchmark_group("arena_init");
    for batches in [1usize, 16] {
        let capacity = batches * ArenaConfig::for_allocations(&batch_sizes()).capacity_bytes;
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let mut arena = TempVectorArena::new();
            b.iter(|| {
                arena.init(&pool, cap).unwrap();
                black_box(arena.buffer_size())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scoped_vector, bench_init);
criterion_main!(benches);
