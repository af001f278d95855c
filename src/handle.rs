use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use std::mem;
use tokio::sync::oneshot::{
    self,
    error::TryRecvError,
};


/// Блокирующее ожидание в потоке tokio runtime запрещено
pub(crate) fn ensure_outside_runtime() -> SpawnResult<()> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(SpawnError::InsideRuntime);
    }
    Ok(())
}

enum Slot<T> {
    Pending(oneshot::Receiver<SpawnResult<T>>),
    Ready(SpawnResult<T>),
    Taken,
}

/// Handle на результат одной задачи.
///
/// Pending -> Ready (значение или ошибка) -> Taken. Результат читается ровно один раз.
pub struct ResultHandle<T> {
    index: usize,
    slot: Slot<T>,
}

impl<T> ResultHandle<T> {

    pub(crate) fn new(index: usize, receiver: oneshot::Receiver<SpawnResult<T>>) -> Self {
        Self {
            index,
            slot: Slot::Pending(receiver),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Неблокирующая проверка: забирает результат из канала, если он уже есть
    pub fn is_ready(&mut self) -> bool {
        if let Slot::Pending(receiver) = &mut self.slot {
            match receiver.try_recv() {
                Ok(result) => self.slot = Slot::Ready(result),
                Err(TryRecvError::Closed) => self.slot = Slot::Ready(Err(SpawnError::ChannelClosed)),
                Err(TryRecvError::Empty) => return false,
            }
        }
        true
    }

    /// Блокирует поток до завершения задачи.
    /// Внутри async runtime возвращает `InsideRuntime`, там нужен `wait_async`.
    pub fn wait(&mut self) -> SpawnResult<()> {
        ensure_outside_runtime()?;
        self.slot = match mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Pending(receiver) => Slot::Ready(
                receiver
                    .blocking_recv()
                    .unwrap_or(Err(SpawnError::ChannelClosed)),
            ),
            settled => settled,
        };
        Ok(())
    }

    pub async fn wait_async(&mut self) {
        if let Slot::Pending(receiver) = &mut self.slot {
            let result = receiver.await.unwrap_or(Err(SpawnError::ChannelClosed));
            self.slot = Slot::Ready(result);
        }
    }

    pub fn take(&mut self) -> SpawnResult<T> {
        match mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(result) => result,
            Slot::Taken => Err(SpawnError::AlreadyTaken(self.index)),
            pending @ Slot::Pending(_) => {
                self.slot = pending;
                Err(SpawnError::NotJoined)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_before_result_arrives_is_not_joined() {
        let (tx, rx) = oneshot::channel::<SpawnResult<u8>>();
        let mut handle = ResultHandle::new(3, rx);

        assert!(!handle.is_ready());
        assert!(matches!(handle.take(), Err(SpawnError::NotJoined)));

        tx.send(Ok(7)).unwrap();
        assert!(handle.is_ready());
        assert_eq!(handle.take().unwrap(), 7);
        assert!(matches!(handle.take(), Err(SpawnError::AlreadyTaken(3))));
    }

    #[test]
    fn dropped_sender_resolves_to_channel_closed() {
        let (tx, rx) = oneshot::channel::<SpawnResult<u8>>();
        let mut handle = ResultHandle::new(0, rx);
        drop(tx);

        handle.wait().unwrap();
        assert_eq!(handle.index(), 0);
        assert!(matches!(handle.take(), Err(SpawnError::ChannelClosed)));
    }

    #[test]
    fn wait_blocks_until_result_sent_from_another_thread() {
        let (tx, rx) = oneshot::channel::<SpawnResult<u8>>();
        let mut handle = ResultHandle::new(1, rx);

        let sender = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            let _ = tx.send(Ok(42));
        });

        handle.wait().unwrap();
        // Повторное ожидание не трогает готовый результат
        handle.wait().unwrap();
        assert_eq!(handle.take().unwrap(), 42);
        handle.wait().unwrap();
        assert!(matches!(handle.take(), Err(SpawnError::AlreadyTaken(1))));
        sender.join().unwrap();
    }

    #[tokio::test]
    async fn wait_inside_runtime_is_rejected() {
        let (tx, rx) = oneshot::channel::<SpawnResult<u8>>();
        let mut handle = ResultHandle::new(0, rx);
        tx.send(Ok(5)).unwrap();

        assert!(matches!(handle.wait(), Err(SpawnError::InsideRuntime)));
        handle.wait_async().await;
        assert_eq!(handle.take().unwrap(), 5);
    }
}
