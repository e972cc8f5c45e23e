//! Debounced content autosave.
//!
//! # Responsibility
//! - Coalesce rapid local edits into one store write after a quiet window.
//! - Always write the latest local value at flush time.
//!
//! # Invariants
//! - A write in progress is never interrupted; edits arriving meanwhile are
//!   picked up by the next flush.
//! - `Autosave::close` (or drop) flushes pending state before returning.
//! - Failed writes are logged and not retried.

use crate::db::Store;
use crate::error::CoreResult;
use crate::model::entity::EntityId;
use crate::model::update::EntityUpdate;
use crate::service::entity_service::EntityService;
use crossbeam::channel::{self, Sender};
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const AUTOSAVE_DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

/// Pending-value state machine driving the autosave worker.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces the pending value and restarts the quiet window at `now`.
    pub fn record(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending value once its window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.flush(),
            _ => None,
        }
    }

    /// Takes the pending value regardless of the window.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

/// Background writer fed with local edits.
pub struct Autosave<T: Send + 'static> {
    sender: Option<Sender<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Autosave<T> {
    /// Spawns the worker thread.
    ///
    /// `write` runs on the worker for every flush, with the latest value.
    pub fn spawn(
        window: Duration,
        mut write: impl FnMut(T) -> CoreResult<()> + Send + 'static,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = channel::unbounded::<T>();
        let worker = thread::Builder::new()
            .name("papergraph-autosave".to_string())
            .spawn(move || {
                let mut debouncer = Debouncer::new(window);
                let mut flush = |value: T| {
                    if let Err(err) = write(value) {
                        warn!(
                            "event=autosave_flush module=autosave status=error error_kind={} error={err}",
                            err.kind().as_str()
                        );
                    }
                };

                loop {
                    let tick = match debouncer.deadline() {
                        Some(deadline) => {
                            channel::after(deadline.saturating_duration_since(Instant::now()))
                        }
                        None => channel::never(),
                    };

                    crossbeam::select! {
                        recv(receiver) -> edit => match edit {
                            Ok(value) => debouncer.record(value, Instant::now()),
                            Err(_) => {
                                if let Some(value) = debouncer.flush() {
                                    flush(value);
                                }
                                break;
                            }
                        },
                        recv(tick) -> _ => {
                            if let Some(value) = debouncer.take_due(Instant::now()) {
                                flush(value);
                            }
                        }
                    }
                }
                debug!("event=autosave_stop module=autosave status=ok");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Records a local edit. Returns `false` when the worker has stopped.
    pub fn edit(&self, value: T) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(value).is_ok())
    }

    /// Flushes pending state and waits for the worker to finish.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=autosave_stop module=autosave status=error error_code=worker_panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for Autosave<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Autosave that writes an entity's body through the regular update path.
pub fn content_autosave(
    store: Arc<Store>,
    entity_id: EntityId,
    window: Duration,
) -> std::io::Result<Autosave<String>> {
    Autosave::spawn(window, move |content: String| {
        EntityService::new(&store)
            .update_entity(entity_id, EntityUpdate::new().content(content))
            .map(|_| ())
    })
}

#[cfg(test)]
mod tests {
    use super::{Autosave, Debouncer};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn debouncer_waits_for_quiet_window() {
        let start = Instant::now();
        let window = Duration::from_millis(100);
        let mut debouncer = Debouncer::new(window);

        debouncer.record("a", start);
        debouncer.record("b", start + Duration::from_millis(50));
        assert_eq!(debouncer.take_due(start + Duration::from_millis(120)), None);
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(150)),
            Some("b")
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn debouncer_flush_ignores_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(60));
        debouncer.record(1, Instant::now());
        assert_eq!(debouncer.flush(), Some(1));
        assert_eq!(debouncer.flush(), None);
    }

    #[test]
    fn rapid_edits_coalesce_into_latest_write() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&writes);
        let autosave = Autosave::spawn(Duration::from_secs(30), move |value: String| {
            sink.lock().unwrap().push(value);
            Ok(())
        })
        .unwrap();

        for idx in 0..5 {
            assert!(autosave.edit(format!("draft {idx}")));
        }
        autosave.close();

        assert_eq!(*writes.lock().unwrap(), vec!["draft 4".to_string()]);
    }

    #[test]
    fn quiet_window_triggers_flush_without_close() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&writes);
        let autosave = Autosave::spawn(Duration::from_millis(20), move |value: u32| {
            sink.lock().unwrap().push(value);
            Ok(())
        })
        .unwrap();

        autosave.edit(1);
        autosave.edit(2);
        thread::sleep(Duration::from_millis(300));
        assert_eq!(*writes.lock().unwrap(), vec![2]);

        autosave.edit(3);
        autosave.close();
        assert_eq!(*writes.lock().unwrap(), vec![2, 3]);
    }
}
