//! Описание среды исполнения, определяется один раз при старте.

/// Может ли вычислительный код в потоках выполняться одновременно
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    Parallel,
    /// Одно ядро: потоки чередуются, но не работают одновременно
    Serialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub logical_cores: usize,
    pub physical_cores: usize,
    pub model: ExecutionModel,
}

impl Capabilities {
    pub fn detect() -> Self {
        let caps = Self::with_cores(num_cpus::get(), num_cpus::get_physical());
        tracing::debug!(
            logical = caps.logical_cores,
            physical = caps.physical_cores,
            model = ?caps.model,
            "detected execution capabilities"
        );
        caps
    }

    pub fn with_cores(logical_cores: usize, physical_cores: usize) -> Self {
        let logical_cores = logical_cores.max(1);
        let model = if logical_cores > 1 {
            ExecutionModel::Parallel
        } else {
            ExecutionModel::Serialized
        };
        Self {
            logical_cores,
            physical_cores: physical_cores.max(1),
            model,
        }
    }

    #[inline]
    pub fn parallel_compute(&self) -> bool {
        self.model == ExecutionModel::Parallel
    }

    /// Сколько из `workers` задач реально могут считаться одновременно
    pub fn usable_parallelism(&self, workers: usize) -> usize {
        match self.model {
            ExecutionModel::Parallel => workers.min(self.logical_cores).max(1),
            ExecutionModel::Serialized => 1,
        }
    }
}
