use super::{
    batch::{Batch, Tracker},
    capability::Capabilities,
    errors::SpawnError,
    handle::{ensure_outside_runtime, ResultHandle},
    model::PoolMetrics,
    result::{collect_values, settle, SpawnResult},
};
use std::{
    cell::Cell,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use crossbeam::channel::{self, Receiver, Sender};
use tokio::sync::oneshot;


type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static WORKER_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Индекс воркера, если вызвано из задачи пула
pub fn current_worker() -> Option<usize> {
    WORKER_INDEX.with(Cell::get)
}


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    /// Емкость очереди; при заполнении `submit` блокируется
    pub max_pending: Option<usize>,
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus * 2,
            max_pending: None,
            thread_name: "batch-pool".to_string(),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus,
            max_pending: Some(num_cpus * 10),
            ..Default::default()
        }
    }

    /// Задачи в основном ждут, поэтому потоков заметно больше, чем ядер
    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 4,
            max_pending: None,
            ..Default::default()
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Default::default()
        }
    }

    /// По потоку на каждое ядро, которое реально считает параллельно.
    /// При `Serialized` остается один поток: остальные только конкурировали бы за ядро.
    pub fn for_capabilities(caps: &Capabilities) -> Self {
        Self {
            num_threads: caps.usable_parallelism(caps.logical_cores),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SpawnResult<()> {
        if self.num_threads == 0 {
            return Err(SpawnError::InvalidPoolSize(self.num_threads));
        }
        if self.max_pending == Some(0) {
            return Err(SpawnError::InvalidQueueCapacity);
        }
        Ok(())
    }
}


#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    idle: AtomicUsize,
    queued: AtomicUsize,
    total_spawned: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}


/// Пул из фиксированного числа OS-потоков, разбирающих общую FIFO-очередь.
///
/// Каждый воркер выполняет одну задачу за раз, поэтому одновременно
/// выполняется не больше `num_threads` задач.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
    counters: Arc<Counters>,
    config: Config,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> SpawnResult<Self> {
        Self::with_config(Config::with_threads(num_threads))
    }

    pub fn with_config(config: Config) -> SpawnResult<Self> {
        config.validate()?;

        let (sender, receiver) = match config.max_pending {
            Some(capacity) => channel::bounded::<Job>(capacity),
            None => channel::unbounded::<Job>(),
        };
        let counters = Arc::new(Counters::default());

        let mut pool = ThreadPool {
            sender: Some(sender),
            workers: Vec::with_capacity(config.num_threads),
            counters: counters.clone(),
            config,
        };

        // Запускаем воркеры
        for index in 0..pool.config.num_threads {
            let receiver = receiver.clone();
            let counters = counters.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", pool.config.thread_name, index))
                .spawn(move || worker_loop(index, receiver, counters));

            match spawned {
                Ok(worker) => pool.workers.push(worker),
                Err(err) => {
                    tracing::error!(worker = index, %err, "failed to spawn worker thread");
                    // Drop закрывает очередь и дожидается уже запущенных воркеров
                    return Err(SpawnError::WorkerSpawn(err));
                }
            }
        }

        tracing::debug!(workers = pool.config.num_threads, "thread pool started");
        Ok(pool)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.config.num_threads
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline(always)]
    fn push_job(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        self.counters.total_spawned.fetch_add(1, Ordering::Relaxed);
        if sender.send(job).is_err() {
            // Очередь закрыта: sender результата дропнут вместе с job, handle получит ChannelClosed
            self.counters.queued.fetch_sub(1, Ordering::Relaxed);
            tracing::error!("work queue closed, unit dropped");
        }
    }

    /// Ставит пары (функция, аргумент) в очередь в порядке итерации.
    ///
    /// Результаты читаются через `Batch` после `wait()`.
    pub fn submit<I, F, A, T>(&self, units: I) -> Batch<T>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> anyhow::Result<T> + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        let units: Vec<(F, A)> = units.into_iter().collect();
        let tracker = Tracker::new(units.len());
        let mut handles = Vec::with_capacity(units.len());

        tracing::debug!(units = units.len(), workers = self.size(), "submitting batch");

        for (index, (unit, arg)) in units.into_iter().enumerate() {
            let (tx, rx) = oneshot::channel::<SpawnResult<T>>();
            let tracker = tracker.clone();
            let counters = self.counters.clone();

            let job: Job = Box::new(move || {
                let result = settle(panic::catch_unwind(AssertUnwindSafe(move || unit(arg))));

                if let Err(err) = &result {
                    tracing::warn!(unit = index, worker = ?current_worker(), %err, "work unit failed");
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                tracker.record(&result);

                let _ = tx.send(result);
            });

            self.push_job(job);
            handles.push(ResultHandle::new(index, rx));
        }

        Batch::new(handles, tracker)
    }

    /// Отправляет батч и блокирует до завершения всех задач
    /// Отправляет батч и блокируется до его завершения.
    /// Внутри tokio runtime ничего не запускает и возвращает `InsideRuntime`.
    pub fn run<I, F, A, T>(&self, units: I) -> SpawnResult<Vec<SpawnResult<T>>>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> anyhow::Result<T> + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        ensure_outside_runtime()?;
        let mut batch = self.submit(units);
        batch.wait()?;
        Ok(batch.drain())
    }

    pub fn run_values<I, F, A, T>(&self, units: I) -> SpawnResult<Vec<T>>
    where
        I: IntoIterator<Item = (F, A)>,
        F: FnOnce(A) -> anyhow::Result<T> + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        collect_values(self.run(units)?)
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.workers.len(),
            active_tasks: self.counters.active.load(Ordering::Relaxed),
            idle_workers: self.counters.idle.load(Ordering::Relaxed),
            queued_tasks: self.counters.queued.load(Ordering::Relaxed),
            total_spawned: self.counters.total_spawned.load(Ordering::Relaxed),
            completed_tasks: self.counters.completed.load(Ordering::Relaxed),
            failed_tasks: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Дожидается уже отправленных задач и останавливает воркеры
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Закрытие канала: воркеры дочитают очередь и выйдут из recv()
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.close();
    }
}


fn worker_loop(index: usize, receiver: Receiver<Job>, counters: Arc<Counters>) {
    WORKER_INDEX.with(|worker| worker.set(Some(index)));
    tracing::debug!(worker = index, "worker started");

    loop {
        counters.idle.fetch_add(1, Ordering::Release);
        let next = receiver.recv();
        counters.idle.fetch_sub(1, Ordering::Acquire);

        let Ok(job) = next else {
            break;
        };

        counters.queued.fetch_sub(1, Ordering::Relaxed);
        counters.active.fetch_add(1, Ordering::Relaxed);
        // Паника задачи перехвачена внутри job, воркер продолжает работу
        job();
        counters.active.fetch_sub(1, Ordering::Relaxed);
    }

    tracing::debug!(worker = index, "worker exiting");
}
