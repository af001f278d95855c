use super::capability::Capabilities;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub workers: usize,
    pub active_tasks: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_spawned: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.active_tasks + self.idle_workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / (self.active_tasks + self.idle_workers) as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}



#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetrics {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchMetrics {
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            return 1.0;
        }
        self.completed as f64 / finished as f64
    }
}


/// Итог сравнения последовательного и конкурентного прогона
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Ускорение близко к числу доступных ядер
    Parallel,
    /// Конкурентный прогон не быстрее последовательного
    Serialized,
    Partial,
}

#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub workers: usize,
    pub sequential: Duration,
    pub concurrent: Duration,
}

impl Comparison {
    pub fn speedup(&self) -> f64 {
        let concurrent = self.concurrent.as_secs_f64();
        if concurrent == 0.0 {
            return 1.0;
        }
        self.sequential.as_secs_f64() / concurrent
    }

    /// 2.5x из 4 воркеров на 4+ ядрах считается настоящим параллелизмом
    pub fn verdict(&self, caps: &Capabilities) -> Verdict {
        let speedup = self.speedup();
        let usable = caps.usable_parallelism(self.workers);
        if usable >= 2 && speedup >= 0.625 * usable as f64 {
            Verdict::Parallel
        } else if speedup < 1.2 {
            Verdict::Serialized
        } else {
            Verdict::Partial
        }
    }
}
