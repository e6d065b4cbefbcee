use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use slot_pool::{Pool, PoolConfig};

fn counter_pool(size: usize) -> Pool<usize> {
    let mut next = 0;
    PoolConfig::<usize>::new(move || {
        next += 1;
        next
    })
    .size(size)
    .build()
    .unwrap()
}

fn idle_acquire_release(pool: &Pool<usize>, count: usize) {
    for _ in 0..count {
        let res = pool.acquire().wait().unwrap();
        pool.release(res).unwrap();
    }
}

// two threads trading a single resource, so most acquires are handed off
fn handoff_acquire_release(pool: &Pool<usize>, count: usize) {
    let other = pool.clone();
    let th = thread::spawn(move || idle_acquire_release(&other, count));
    idle_acquire_release(pool, count);
    th.join().unwrap();
}

fn bench_pool(c: &mut Criterion) {
    let count = 1000;
    let mut group = c.benchmark_group("pool");

    let idle = counter_pool(1);
    group.bench_with_input(BenchmarkId::new("idle", count), &count, |b, &count| {
        b.iter(|| idle_acquire_release(&idle, count))
    });

    let contended = counter_pool(1);
    group.bench_with_input(BenchmarkId::new("handoff", count), &count, |b, &count| {
        b.iter(|| handoff_acquire_release(&contended, count))
    });

    group.finish();
}

criterion_group!(benches, bench_pool);
criterion_main!(benches);
