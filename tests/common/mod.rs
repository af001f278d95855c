#![allow(dead_code)]

use std::{
    panic,
    sync::{Mutex, Once},
    thread,
};

static QUIET_THREADS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
static INSTALL_HOOK: Once = Once::new();

/// Глушит вывод паник в потоках, чье имя содержит `marker`.
/// Хук ставится один раз на процесс, паники остальных потоков уходят в прежний хук.
pub fn quiet_panics_in(marker: &'static str) {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !thread::current().name().is_some_and(is_quiet) {
                previous(info);
            }
        }));
    });

    if let Ok(mut markers) = QUIET_THREADS.lock() {
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }
}

pub fn is_quiet(thread_name: &str) -> bool {
    QUIET_THREADS
        .lock()
        .map(|markers| markers.iter().any(|m| thread_name.contains(m)))
        .unwrap_or(false)
}
