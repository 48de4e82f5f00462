//! Deferred invalidation dispatch.
//!
//! Invalidation must not run inside the critical section of whatever
//! subsystem reported a change: an ontology editor firing "fact changed"
//! while holding its own locks cannot be made to wait on cache locks and
//! listener callbacks. [ChangeDispatcher] decouples the two with a channel:
//! collaborators send [ChangeEvent]s from wherever they are, and a dedicated
//! worker thread (running its own current-thread tokio runtime) drains the
//! queue and performs the actual [crate::cache::ProofCache::handle_event]
//! calls, including listener fan-out.
//!
//! ## Threading Model
//!
//! - **Producers**: any thread; [ChangeDispatcher::sink] handles are cheap
//!   clones of the channel sender and can be passed to
//!   [crate::source::ProofSource::subscribe] /
//!   [crate::source::StatedProvider::subscribe]
//! - **Worker thread**: owns the receiving half, applies events in arrival
//!   order; a slow listener delays only this queue, never a producer
//! - **Shutdown**: [ChangeDispatcher::shutdown] signals the worker and joins
//!   it; events still queued are dropped. Plain `drop` signals the worker
//!   and detaches.

use std::{sync::Arc, thread::JoinHandle};
use tokio::sync::{mpsc, oneshot};

use crate::{cache::ProofCache, error::LogosError, event::ChangeEvent, source::ChangeSink};

pub struct ChangeDispatcher {
    tx: ChangeSink,
    stop: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ChangeDispatcher {
    /// Spawn the worker thread draining change events into `cache`.
    pub fn spawn(cache: Arc<ProofCache>) -> Result<Self, LogosError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
        let (stop, mut stopped) = oneshot::channel::<()>();
        let worker = std::thread::Builder::new()
            .name("logos-invalidation".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::error!("invalidation dispatcher failed to start: {err}");
                        return;
                    }
                };
                runtime.block_on(async move {
                    loop {
                        tokio::select! {
                            _ = &mut stopped => break,
                            event = rx.recv() => match event {
                                Some(event) => {
                                    tracing::debug!(%event, "dispatching invalidation");
                                    cache.handle_event(&event);
                                }
                                None => break,
                            },
                        }
                    }
                });
                tracing::debug!("invalidation dispatcher stopped");
            })?;
        Ok(ChangeDispatcher {
            tx,
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Spawn and immediately subscribe the dispatcher to `source` and
    /// `stated` change callbacks.
    pub fn spawn_subscribed(
        cache: Arc<ProofCache>,
        source: &dyn crate::source::ProofSource,
        stated: &dyn crate::source::StatedProvider,
    ) -> Result<Self, LogosError> {
        let dispatcher = ChangeDispatcher::spawn(cache)?;
        source.subscribe(dispatcher.sink());
        stated.subscribe(dispatcher.sink());
        Ok(dispatcher)
    }

    /// A sender handle for collaborators that report changes. Sends after
    /// shutdown are accepted and ignored.
    pub fn sink(&self) -> ChangeSink {
        self.tx.clone()
    }

    /// Enqueue one event directly.
    pub fn send(&self, event: ChangeEvent) -> Result<(), LogosError> {
        self.tx.send(event)?;
        Ok(())
    }

    /// Stop the worker and wait for it to finish the event it is currently
    /// applying. Events still queued behind it are dropped.
    pub fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("invalidation dispatcher worker panicked");
            }
        }
    }
}

impl Drop for ChangeDispatcher {
    fn drop(&mut self) {
        // Signal and detach; shutdown() already joined when it ran.
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
