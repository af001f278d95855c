use super::{
    errors::SpawnError,
    handle::{ensure_outside_runtime, ResultHandle},
    model::BatchMetrics,
    result::{collect_values, SpawnResult},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};


/// Счетчики батча, разделяются между задачами
pub(crate) struct Tracker {
    pending: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Tracker {
    pub(crate) fn new(len: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicUsize::new(len),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        })
    }

    /// Вызывается ровно один раз на задачу, до отправки результата
    pub(crate) fn record<T>(&self, result: &SpawnResult<T>) {
        if result.is_ok() {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.pending.fetch_sub(1, Ordering::Release);
    }
}


/// Батч отправленных задач: барьер ожидания плюс handles в порядке отправки.
///
/// Результаты доступны только после `wait()` / `wait_async()`,
/// до этого любое чтение возвращает `SpawnError::NotJoined`.
pub struct Batch<T> {
    handles: Vec<ResultHandle<T>>,
    tracker: Arc<Tracker>,
    joined: bool,
}

impl<T> Batch<T> {
    pub(crate) fn new(handles: Vec<ResultHandle<T>>, tracker: Arc<Tracker>) -> Self {
        Self {
            handles,
            tracker,
            joined: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[inline]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Блокирует до завершения всех задач батча
    /// Внутри tokio runtime возвращает `InsideRuntime`, батч остается не собранным
    pub fn wait(&mut self) -> SpawnResult<()> {
        ensure_outside_runtime()?;
        for handle in &mut self.handles {
            handle.wait()?;
        }
        self.joined = true;
        tracing::trace!(units = self.handles.len(), "batch joined");
        Ok(())
    }

    pub async fn wait_async(&mut self) {
        for handle in &mut self.handles {
            handle.wait_async().await;
        }
        self.joined = true;
        tracing::trace!(units = self.handles.len(), "batch joined");
    }

    /// Результат задачи `index`, читается один раз
    pub fn result(&mut self, index: usize) -> SpawnResult<T> {
        if !self.joined {
            return Err(SpawnError::NotJoined);
        }
        let len = self.handles.len();
        self.handles
            .get_mut(index)
            .ok_or(SpawnError::OutOfRange { index, len })?
            .take()
    }

    /// Все результаты в порядке отправки
    pub fn into_results(self) -> SpawnResult<Vec<SpawnResult<T>>> {
        if !self.joined {
            return Err(SpawnError::NotJoined);
        }
        Ok(self.drain())
    }

    /// Все значения, либо первая ошибка в порядке отправки
    pub fn into_values(self) -> SpawnResult<Vec<T>> {
        collect_values(self.into_results()?)
    }

    #[inline]
    pub fn metrics(&self) -> BatchMetrics {
        BatchMetrics {
            pending: self.tracker.pending.load(Ordering::Acquire),
            completed: self.tracker.completed.load(Ordering::Acquire),
            failed: self.tracker.failed.load(Ordering::Acquire),
        }
    }

    pub(crate) fn drain(self) -> Vec<SpawnResult<T>> {
        self.handles
            .into_iter()
            .map(|mut handle| handle.take())
            .collect()
    }
}
