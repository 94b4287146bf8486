//! Cancellable subscription handles.
//!
//! Every continuous observation returns a [`Subscription`]. Items arrive on an
//! unbounded channel fed by the database; the handle unregisters its watcher
//! when cancelled or dropped, so an observation lives exactly as long as the
//! session that owns it.

use tokio::sync::mpsc;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to a continuous observation.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    cancel: Option<CancelFn>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver with the callback that unregisters its watcher.
    pub fn new(receiver: mpsc::UnboundedReceiver<T>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { receiver, cancel: Some(Box::new(cancel)) }
    }

    /// Subscription with no backing watcher. Yields nothing once `receiver`
    /// is drained.
    pub fn detached(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self { receiver, cancel: None }
    }

    /// Next item if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next item. `None` once the watcher is gone and the
    /// channel is drained.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// All items that are ready now.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Unregister the watcher. Items already queued are discarded.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.receiver.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[test]
    fn drop_runs_cancel_once() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::unbounded_channel::<u8>();

        let flag = Arc::clone(&cancelled);
        let sub = Subscription::new(rx, move || flag.store(true, Ordering::SeqCst));
        drop(sub);

        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn drain_returns_ready_items() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::detached(rx);
        for i in 0..3u8 {
            tx.send(i).ok();
        }
        assert_eq!(sub.drain(), vec![0, 1, 2]);
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn cancel_closes_channel() {
        let (tx, rx) = mpsc::unbounded_channel::<u8>();
        let sub = Subscription::new(rx, || {});
        sub.cancel();
        assert!(tx.is_closed());
    }
}
