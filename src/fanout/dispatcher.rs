//! Broadcast engine
//!
//! One dispatcher per relay. It drains the inbound queue and performs one
//! fan-out pass per envelope; a pass finishes before the next envelope is
//! taken, so every consumer sees envelopes in queue order. A consumer that
//! is behind delays the pass; only a dead connection is removed.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Level;

use crate::core::Envelope;
use crate::fanout::queue::QueueReceiver;
use crate::fanout::registry::{ConnectionRegistry, ConsumerConnection, Handle, Verdict};
use crate::infrastructure::metrics::RelayMetrics;
use crate::ws::TransportError;

/// Outcome of one fan-out pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that accepted the payload
    pub delivered: usize,
    /// Connections removed because delivery failed
    pub pruned: Vec<Handle>,
}

/// Single consumer of the inbound queue
pub struct Dispatcher<C> {
    queue: QueueReceiver,
    registry: Arc<ConnectionRegistry<C>>,
    metrics: Arc<RelayMetrics>,
}

impl<C: ConsumerConnection + 'static> Dispatcher<C> {
    pub fn new(
        queue: QueueReceiver,
        registry: Arc<ConnectionRegistry<C>>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            queue,
            registry,
            metrics,
        }
    }

    /// Run the dispatch loop on the current task
    ///
    /// Returns once the queue is closed, i.e. the owning relay was dropped.
    pub async fn run(mut self) {
        crate::log_dispatch!(Level::INFO, "Dispatcher started");
        while let Some(envelope) = self.queue.next().await {
            self.broadcast(&envelope).await;
        }
        crate::log_dispatch!(Level::INFO, "Inbound queue closed, dispatcher stopping");
    }

    /// Run the dispatch loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    #[cfg(test)]
    pub(crate) fn queue_mut(&mut self) -> &mut QueueReceiver {
        &mut self.queue
    }

    /// Deliver one envelope to every registered consumer
    ///
    /// Consumers that are behind are waited on once the registry lock is
    /// released. Consumers whose delivery fails are removed after the pass;
    /// the pass itself always continues to the remaining consumers.
    pub async fn broadcast(&self, envelope: &Envelope) -> BroadcastReport {
        let payload: Arc<str> = match envelope.encode() {
            Ok(text) => text.into(),
            Err(e) => {
                crate::log_dispatch!(Level::ERROR, error = %e, "Failed to encode envelope");
                return BroadcastReport::default();
            }
        };

        let mut delivered = 0;
        let mut waiting = Vec::new();
        let mut pruned = self.registry.for_each(|handle, conn| match conn.deliver(&payload) {
            Ok(()) => {
                delivered += 1;
                Verdict::Keep
            }
            Err(TransportError::Backlogged(pending)) => {
                crate::log_dispatch!(Level::DEBUG, %handle, pending, "Consumer behind, waiting for room");
                waiting.push((handle, conn.deliver_when_ready(payload.clone())));
                Verdict::Keep
            }
            Err(e) => {
                crate::log_dispatch!(Level::WARN, %handle, error = %e, "Delivery failed, dropping consumer");
                Verdict::Remove
            }
        });

        let retries = waiting
            .into_iter()
            .map(|(handle, delivery)| async move { (handle, delivery.await) });
        for (handle, result) in join_all(retries).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    crate::log_dispatch!(Level::WARN, %handle, error = %e, "Delivery failed, dropping consumer");
                    if self.registry.unregister(handle) {
                        pruned.push(handle);
                    }
                }
            }
        }

        self.metrics.record_broadcast(delivered, pruned.len());
        crate::log_dispatch!(
            Level::DEBUG,
            level = envelope.wire_level(),
            delivered,
            pruned = pruned.len(),
            "Broadcast complete"
        );

        BroadcastReport { delivered, pruned }
    }
}
