use super::errors::SpawnError;

pub type SpawnResult<T> = Result<T, SpawnError>;

/// Результат задачи: ошибка задачи и паника приводятся к `SpawnError`
pub(crate) fn settle<T>(
    outcome: std::thread::Result<anyhow::Result<T>>,
) -> SpawnResult<T> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SpawnError::Failed(err)),
        Err(panic_info) => Err(SpawnError::from_panic(panic_info)),
    }
}

/// Первая ошибка в порядке отправки, иначе все значения
pub fn collect_values<T>(results: Vec<SpawnResult<T>>) -> SpawnResult<Vec<T>> {
    results.into_iter().collect()
}
