//! Кооперативный режим: все задачи на одном потоке, переключение только в точках `.await`.

use super::{
    batch::{Batch, Tracker},
    errors::SpawnError,
    handle::{ensure_outside_runtime, ResultHandle},
    result::{collect_values, settle, SpawnResult},
};
use std::{
    collections::VecDeque,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};
use futures::{
    FutureExt,
    stream::{FuturesUnordered, StreamExt},
};
use tokio::{
    runtime::Builder,
    sync::oneshot,
};


/// Однопоточный планировщик задач-future.
///
/// Задачи не вытесняются: пока задача не дошла до `.await`, остальные стоят.
/// Готовые к продолжению задачи опрашиваются в порядке пробуждения.
#[derive(Debug, Clone, Default)]
pub struct LocalScheduler {
    limit: Option<usize>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self { limit: None }
    }

    /// Не больше `limit` задач в работе одновременно, остальные ждут в FIFO-очереди
    pub fn with_limit(limit: usize) -> SpawnResult<Self> {
        if limit == 0 {
            return Err(SpawnError::InvalidPoolSize(limit));
        }
        Ok(Self { limit: Some(limit) })
    }

    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Выполняет все задачи в текущей задаче вызывающего и возвращает уже дождавшийся батч
    pub async fn drive<I, F, A, Fut, T>(&self, units: I) -> Batch<T>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let units: Vec<(F, A)> = units.into_iter().collect();
        let tracker = Tracker::new(units.len());
        let mut handles = Vec::with_capacity(units.len());
        let mut queue = VecDeque::with_capacity(units.len());

        tracing::debug!(units = units.len(), limit = ?self.limit, "driving cooperative batch");

        for (index, (unit, arg)) in units.into_iter().enumerate() {
            let (tx, rx) = oneshot::channel::<SpawnResult<T>>();
            handles.push(ResultHandle::new(index, rx));
            queue.push_back(run_unit(index, unit, arg, tracker.clone(), tx));
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        let mut in_flight = FuturesUnordered::new();

        // Заполняем начальную партию
        while in_flight.len() < limit {
            match queue.pop_front() {
                Some(task) => in_flight.push(task),
                None => break,
            }
        }

        while in_flight.next().await.is_some() {
            if let Some(task) = queue.pop_front() {
                in_flight.push(task);
            }
        }

        let mut batch = Batch::new(handles, tracker);
        batch.wait_async().await;
        batch
    }

    pub async fn run_async<I, F, A, Fut, T>(&self, units: I) -> Vec<SpawnResult<T>>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.drive(units).await.drain()
    }

    /// Поднимает однопоточный runtime и выполняет батч на нем.
    /// Нельзя вызывать из потока, где уже работает tokio runtime.
    pub fn run<I, F, A, Fut, T>(&self, units: I) -> SpawnResult<Vec<SpawnResult<T>>>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        ensure_outside_runtime()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SpawnError::Runtime)?;
        Ok(runtime.block_on(self.run_async(units)))
    }

    pub fn run_values<I, F, A, Fut, T>(&self, units: I) -> SpawnResult<Vec<T>>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        collect_values(self.run(units)?)
    }
}


async fn run_unit<F, A, Fut, T>(
    index: usize,
    unit: F,
    arg: A,
    tracker: Arc<Tracker>,
    tx: oneshot::Sender<SpawnResult<T>>,
)
where
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    // Вызов unit(arg) тоже внутри catch_unwind: паника до первого .await ловится так же
    let result = settle(
        AssertUnwindSafe(async move { unit(arg).await })
            .catch_unwind()
            .await,
    );

    if let Err(err) = &result {
        tracing::warn!(unit = index, %err, "cooperative unit failed");
    }
    tracker.record(&result);

    let _ = tx.send(result);
}
