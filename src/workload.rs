//! Пробные нагрузки для замеров: счетная задача и ожидания по таймеру.

use super::{capability::Capabilities, model::Comparison};
use std::{
    thread,
    time::{Duration, Instant},
};

/// Сумма квадратов 0..n, переполнение заворачивается
pub fn cpu_intensive(n: u64) -> u64 {
    (0..n).fold(0u64, |acc, i| acc.wrapping_add(i.wrapping_mul(i)))
}

/// Блокирующее ожидание, поток спит и не занимает ядро
pub fn blocking_sleep(id: usize, delay: Duration) -> anyhow::Result<usize> {
    tracing::trace!(unit = id, thread = ?thread::current().name(), "sleeping");
    thread::sleep(delay);
    Ok(id)
}

/// Точка кооперативного переключения: пока задача спит, планировщик ведет другие
pub async fn async_sleep(id: usize, delay: Duration) -> anyhow::Result<usize> {
    tracing::trace!(unit = id, "awaiting timer");
    tokio::time::sleep(delay).await;
    Ok(id)
}

pub fn measure<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

/// Сравнение последовательного прогона и прогона через `concurrent`
pub fn compare<S, C>(workers: usize, sequential: S, concurrent: C) -> Comparison
where
    S: FnOnce(),
    C: FnOnce(),
{
    let ((), sequential) = measure(sequential);
    let ((), concurrent) = measure(concurrent);
    Comparison {
        workers,
        sequential,
        concurrent,
    }
}

/// Короткое описание того, что ожидать от счетных задач в потоках на этой машине
pub fn expectation(caps: &Capabilities, workers: usize) -> String {
    let usable = caps.usable_parallelism(workers);
    if usable > 1 {
        format!("up to {usable}x speedup for {workers} compute-bound workers")
    } else {
        "no speedup for compute-bound workers, only waits overlap".to_string()
    }
}
