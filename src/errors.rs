use thiserror::Error;

/// Ошибки пула, батча и отдельных задач
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Задача вернула ошибку, исходный тип доступен через `downcast_ref`
    #[error("work unit failed: {0}")]
    Failed(#[source] anyhow::Error),
    #[error("work unit panicked: {0}")]
    Panic(String),
    #[error("result channel closed before the unit finished")]
    ChannelClosed,
    #[error("pool size must be at least 1 (got {0})")]
    InvalidPoolSize(usize),
    #[error("queue capacity must be at least 1")]
    InvalidQueueCapacity,
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("failed to build cooperative runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Блокирующий вызов из потока, где работает tokio runtime
    #[error("blocking wait called inside a tokio runtime, use wait_async/run_async")]
    InsideRuntime,
    /// Результат запрошен до `wait()`
    #[error("batch has not been waited on")]
    NotJoined,
    #[error("result {0} was already taken")]
    AlreadyTaken(usize),
    #[error("index {index} is out of range for a batch of {len}")]
    OutOfRange { index: usize, len: usize },
}

impl SpawnError {
    /// Ошибка самой задачи, а не пула или вызывающего кода
    pub fn is_unit_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Panic(_))
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic in work unit".to_string()
        };
        Self::Panic(message)
    }
}
