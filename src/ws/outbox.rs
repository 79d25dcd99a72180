//! Per-consumer outbox
//!
//! The dispatcher cannot await while it holds the registry lock, so each
//! consumer gets a bounded channel. The dispatcher `try_send`s into it and
//! the consumer's writer task drains it onto the socket. A full outbox means
//! the consumer is behind; the dispatcher then waits for room outside the
//! lock. Only a closed outbox fails delivery.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::fanout::ConsumerConnection;

/// Default per-consumer outbox capacity
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Errors on a single connection, never propagated past its session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,
    #[error("Consumer backlog full ({0} pending)")]
    Backlogged(usize),
}

/// Create an outbox pair
pub fn outbox(capacity: usize) -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (Outbox { tx }, OutboxReceiver { rx })
}

/// Registry-side half of a consumer connection
#[derive(Debug)]
pub struct Outbox {
    tx: mpsc::Sender<Arc<str>>,
}

impl ConsumerConnection for Outbox {
    #[inline]
    fn deliver(&self, payload: &Arc<str>) -> Result<(), TransportError> {
        self.tx.try_send(payload.clone()).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Backlogged(self.tx.max_capacity()),
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn deliver_when_ready(&self, payload: Arc<str>) -> BoxFuture<'static, Result<(), TransportError>> {
        let tx = self.tx.clone();
        async move { tx.send(payload).await.map_err(|_| TransportError::Closed) }.boxed()
    }

    /// Dropping the sender ends the writer task, which then closes the socket
    fn close(self) {
        drop(self.tx);
    }
}

/// Writer-side half of a consumer connection
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<Arc<str>>,
}

impl OutboxReceiver {
    /// Next payload, `None` once the outbox was closed
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Next payload if one is already waiting
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (tx, mut rx) = outbox(4);
        let payload: Arc<str> = Arc::from(r#"{"level":0}"#);
        tx.deliver(&payload).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some(r#"{"level":0}"#));
    }

    #[tokio::test]
    async fn test_full_outbox_reports_backlog() {
        let (tx, _rx) = outbox(1);
        let payload: Arc<str> = Arc::from("x");
        tx.deliver(&payload).unwrap();
        assert_eq!(tx.deliver(&payload), Err(TransportError::Backlogged(1)));
    }

    #[tokio::test]
    async fn test_deliver_when_ready_waits_for_room() {
        let (tx, mut rx) = outbox(1);
        tx.deliver(&Arc::from("first")).unwrap();

        let mut delivery = tokio_test::task::spawn(tx.deliver_when_ready(Arc::from("second")));
        assert!(delivery.poll().is_pending());

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(delivery.await, Ok(()));
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_deliver_when_ready_fails_once_writer_is_gone() {
        let (tx, rx) = outbox(1);
        tx.deliver(&Arc::from("first")).unwrap();
        let delivery = tx.deliver_when_ready(Arc::from("second"));
        drop(rx);
        assert_eq!(delivery.await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_dead_writer_fails_delivery() {
        let (tx, rx) = outbox(1);
        drop(rx);
        assert_eq!(tx.deliver(&Arc::from("x")), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_close_ends_receiver() {
        let (tx, mut rx) = outbox(2);
        tx.deliver(&Arc::from("last")).unwrap();
        tx.close();
        assert_eq!(rx.recv().await.as_deref(), Some("last"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "Connection closed");
        assert_eq!(
            TransportError::Backlogged(256).to_string(),
            "Consumer backlog full (256 pending)"
        );
    }
}
