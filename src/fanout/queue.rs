//! Inbound queue between producer sessions and the dispatcher
//!
//! Bounded MPSC channel. When full, `push` waits for space, which slows only
//! the producer session doing the push. The receiving half is a single value
//! owned by the dispatcher.

use tokio::sync::mpsc;

use crate::core::Envelope;

/// Default inbound queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// The dispatcher is gone, nothing can be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("inbound queue closed")]
pub struct QueueClosed;

/// Create a bounded inbound queue
///
/// # Panics
/// Panics if `capacity` is zero (validated earlier by config loading).
pub fn bounded(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer-side handle
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<Envelope>,
}

impl QueueSender {
    /// Append an envelope, waiting while the queue is full
    pub async fn push(&self, envelope: Envelope) -> Result<(), QueueClosed> {
        self.tx.send(envelope).await.map_err(|_| QueueClosed)
    }

    /// Envelopes currently waiting for the dispatcher
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Dispatcher-side handle
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl QueueReceiver {
    /// Wait for the next envelope, `None` once every sender is dropped
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Non-blocking variant for tests
    #[cfg(test)]
    pub(crate) fn try_next(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}
