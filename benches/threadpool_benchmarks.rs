use batch_pool::{
    cooperative::LocalScheduler,
    pool::{Config as PoolConfig, ThreadPool},
    workload::cpu_intensive,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tokio::time::Duration;

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// Benchmark 1: Submit + join overhead
fn bench_submit_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_overhead");

    for size in [100usize, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("pool_run", size), &size, |b, &size| {
            let pool = ThreadPool::with_config(PoolConfig::default()).unwrap();
            b.iter(|| {
                let results = pool
                    .run((0..size).map(|i| (|i: usize| -> anyhow::Result<usize> { Ok(black_box(i)) }, i)))
                    .unwrap();
                black_box(results);
            });
        });

        group.bench_with_input(BenchmarkId::new("cooperative", size), &size, |b, &size| {
            let rt = create_runtime();
            let scheduler = LocalScheduler::new();
            b.to_async(&rt).iter(|| {
                let scheduler = &scheduler;
                async move {
                    let results = scheduler
                        .run_async((0..size).map(|i| {
                            (|i: usize| async move { Ok::<_, anyhow::Error>(black_box(i)) }, i)
                        }))
                        .await;
                    black_box(results);
                }
            });
        });
    }

    group.finish();
}

// Benchmark 2: Compute-bound units, sequential vs pool
fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    group.sample_size(20);
    let n = 200_000u64;

    for workers in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("sequential", workers), &workers, |b, &workers| {
            b.iter(|| {
                for _ in 0..workers {
                    black_box(cpu_intensive(black_box(n)));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("pool", workers), &workers, |b, &workers| {
            let pool = ThreadPool::new(workers).unwrap();
            b.iter(|| {
                let values = pool
                    .run_values((0..workers).map(|_| {
                        (|n: u64| -> anyhow::Result<u64> { Ok(cpu_intensive(black_box(n))) }, n)
                    }))
                    .unwrap();
                black_box(values);
            });
        });
    }

    group.finish();
}

// Benchmark 3: Timed waits, pool threads vs cooperative timers
fn bench_waits(c: &mut Criterion) {
    let mut group = c.benchmark_group("waits");
    group.sample_size(10);
    let delay = Duration::from_millis(5);

    group.bench_function("pool_16x5ms", |b| {
        let pool = ThreadPool::new(16).unwrap();
        b.iter(|| {
            let results = pool.run((0..16).map(|i| {
                (
                    move |i: usize| -> anyhow::Result<usize> {
                        std::thread::sleep(delay);
                        Ok(i)
                    },
                    i,
                )
            }))
            .unwrap();
            black_box(results);
        });
    });

    group.bench_function("cooperative_16x5ms", |b| {
        let rt = create_runtime();
        let scheduler = LocalScheduler::new();
        b.to_async(&rt).iter(|| {
            let scheduler = &scheduler;
            async move {
                let results = scheduler
                    .run_async((0..16).map(|i| {
                        (
                            move |i: usize| async move {
                                tokio::time::sleep(delay).await;
                                Ok::<_, anyhow::Error>(i)
                            },
                            i,
                        )
                    }))
                    .await;
                black_box(results);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_submit_overhead, bench_compute, bench_waits);
criterion_main!(benches);
