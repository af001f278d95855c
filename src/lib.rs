//! Пул фиксированного размера и кооперативный планировщик с упорядоченным барьером ожидания
//!
//! # Features
//! - Фиксированное число OS-потоков, общая FIFO-очередь
//! - Однопоточный кооперативный режим: переключение только на `.await`
//! - Результаты в порядке отправки, ошибки и паники изолированы в своей задаче
//! - Чтение результатов только после ожидания всего батча
//! - Метрики пула и батча
//! - Описание среды исполнения (число ядер, есть ли настоящий параллелизм)

pub mod batch;
pub mod capability;
pub mod cooperative;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod workload;

pub use batch::Batch;
pub use capability::{Capabilities, ExecutionModel};
pub use cooperative::LocalScheduler;
pub use errors::SpawnError;
pub use pool::{current_worker, Config, ThreadPool};
pub use result::SpawnResult;
