//! Relay context
//!
//! Owns the registry, the producer side of the inbound queue, the level
//! filter and the metrics. Built once at startup and shared with every
//! session handler.

use std::sync::Arc;
use tracing::Level;

use crate::core::{Envelope, LevelFilter, LogRecord, ParseError};
use crate::fanout::dispatcher::Dispatcher;
use crate::fanout::queue::{self, QueueClosed, QueueSender};
use crate::fanout::registry::{ConnectionRegistry, ConsumerConnection, Handle};
use crate::infrastructure::metrics::RelayMetrics;
use crate::ws::Outbox;

/// What `submit` did with an accepted payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A log record was queued for broadcast
    Queued,
    /// A clear-on-start or clear-on-finish control message was queued
    Control,
    /// The record was below the configured threshold and dropped
    Filtered,
}

/// `submit` failures
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Message did not abide by the proper format: {0}")]
    Format(#[from] ParseError),

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

/// Shared relay state handed to every session
pub struct Relay<C = Outbox> {
    registry: Arc<ConnectionRegistry<C>>,
    queue: QueueSender,
    filter: LevelFilter,
    metrics: Arc<RelayMetrics>,
}

impl<C: ConsumerConnection + 'static> Relay<C> {
    /// Build the relay and its dispatcher
    ///
    /// The dispatcher holds the only receiving end of the inbound queue and
    /// must be run (or spawned) by the caller.
    pub fn new(filter: LevelFilter, queue_capacity: usize) -> (Self, Dispatcher<C>) {
        let (tx, rx) = queue::bounded(queue_capacity);
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::new());
        let dispatcher = Dispatcher::new(rx, registry.clone(), metrics.clone());

        let relay = Self {
            registry,
            queue: tx,
            filter,
            metrics,
        };
        (relay, dispatcher)
    }

    /// Register an accepted consumer connection
    pub fn register_consumer(&self, conn: C) -> Handle {
        self.registry.register(conn)
    }

    /// Retire a consumer; unknown handles are ignored
    pub fn unregister_consumer(&self, handle: Handle) -> bool {
        self.registry.unregister(handle)
    }

    /// Classify a raw producer payload and queue it if accepted
    ///
    /// `clears` and `clearf` are control messages and skip the level filter.
    /// Anything else is parsed as a log record.
    ///
    /// # Errors
    /// `SubmitError::Format` if the payload is not a valid record; nothing is
    /// queued in that case.
    pub async fn submit(&self, raw: &[u8]) -> Result<SubmitOutcome, SubmitError> {
        self.metrics.record_received();

        let envelope = if let Some(control) = Envelope::control(raw) {
            control
        } else {
            match LogRecord::parse(raw) {
                Ok(record) => Envelope::Record(record),
                Err(e) => {
                    self.metrics.record_rejected();
                    return Err(e.into());
                }
            }
        };

        if !self.filter.admits(&envelope) {
            self.metrics.record_filtered();
            crate::log_producer!(
                Level::DEBUG,
                level = envelope.wire_level(),
                threshold = %self.filter.threshold(),
                "Did not queue message due to log level"
            );
            return Ok(SubmitOutcome::Filtered);
        }

        let is_control = envelope.is_control();
        self.queue.push(envelope).await?;

        if is_control {
            self.metrics.record_control();
            Ok(SubmitOutcome::Control)
        } else {
            self.metrics.record_queued();
            Ok(SubmitOutcome::Queued)
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn filter(&self) -> LevelFilter {
        self.filter
    }

    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    /// Envelopes waiting for the dispatcher
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }
}
