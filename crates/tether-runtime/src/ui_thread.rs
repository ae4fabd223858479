#![forbid(unsafe_code)]

//! Dedicated UI-affine thread.
//!
//! Platforms without a native run loop of their own (and tests) can start a
//! [`UiThread`]: a named thread that binds a fresh [`Dispatcher`] to itself
//! and drains it until shut down.
//!
//! Platforms that do own the main thread keep using
//! [`Dispatcher::for_current_thread`] and call
//! [`Dispatcher::run_pending`] from their native loop instead.
//!
//! # Lifecycle
//!
//! - `start` returns only after the thread has bound the dispatcher, so
//!   `dispatcher().is_ui_thread()` is already meaningful on return.
//! - `shutdown` (or drop) stops the loop, drops queued work, and joins.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::failure::DispatchError;

/// A thread that owns and drains a [`Dispatcher`].
#[derive(Debug)]
pub struct UiThread {
    dispatcher: Dispatcher,
    handle: Option<JoinHandle<()>>,
}

impl UiThread {
    /// Spawn the thread and wait until it owns the dispatcher.
    pub fn start(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let dispatcher = Dispatcher::new(config);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), DispatchError>>(1);

        let worker = dispatcher.clone();
        let handle = thread::Builder::new()
            .name(dispatcher.name().to_string())
            .spawn(move || {
                if let Err(err) = worker.affinity().bind_current() {
                    let _ = ready_tx.send(Err(err.into()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                if let Err(err) = worker.run() {
                    warn!(error = %err, "UI thread loop exited with error");
                }
                debug!(name = worker.name(), "UI thread exiting");
            })
            .map_err(|err| DispatchError::Spawn(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                dispatcher,
                handle: Some(handle),
            }),
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(DispatchError::Spawn("UI thread exited during startup".into()))
            }
        }
    }

    /// Handle to the thread's dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop the loop, drop queued work, and join the thread.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.dispatcher.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from inside its own loop; the loop exits on return.
                return;
            }
            if handle.join().is_err() {
                warn!(name = self.dispatcher.name(), "UI thread panicked");
            }
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn start_binds_dispatcher_to_new_thread() {
        let ui = UiThread::start(DispatcherConfig::named("ui-test")).unwrap();
        assert!(ui.dispatcher().affinity().thread_id().is_some());
        assert!(!ui.dispatcher().is_ui_thread());

        let (tx, rx) = mpsc::channel();
        let d = ui.dispatcher().clone();
        ui.dispatcher()
            .enqueue(move || {
                tx.send((d.is_ui_thread(), thread::current().name().map(String::from)))
                    .unwrap();
            })
            .unwrap();
        let (on_ui, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(on_ui);
        assert_eq!(name.as_deref(), Some("ui-test"));
        ui.shutdown();
    }

    #[test]
    fn work_from_many_threads_runs_on_ui_thread() {
        let ui = UiThread::start(DispatcherConfig::default()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let off_thread = Arc::new(AtomicBool::new(false));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let d = ui.dispatcher().clone();
                let count = Arc::clone(&count);
                let off_thread = Arc::clone(&off_thread);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let (count, off_thread, checker) =
                            (Arc::clone(&count), Arc::clone(&off_thread), d.clone());
                        d.enqueue(move || {
                            if !checker.is_ui_thread() {
                                off_thread.store(true, Ordering::SeqCst);
                            }
                            count.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let (tx, rx) = mpsc::channel();
        ui.dispatcher().enqueue(move || tx.send(()).unwrap()).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 100);
        assert!(!off_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn drop_shuts_down_and_rejects_enqueue() {
        let ui = UiThread::start(DispatcherConfig::default()).unwrap();
        let d = ui.dispatcher().clone();
        drop(ui);
        assert!(d.is_shut_down());
        assert_eq!(d.enqueue(|| {}), Err(DispatchError::ShutDown));
    }
}
