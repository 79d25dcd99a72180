//! Relay counters
//!
//! Lock-free atomic counters updated by producer sessions and the
//! dispatcher. Snapshots are taken for the stats endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Relay metrics collector
pub struct RelayMetrics {
    /// Payloads received from producers
    received: AtomicU64,
    /// Log records placed on the inbound queue
    queued: AtomicU64,
    /// Control messages placed on the inbound queue
    control: AtomicU64,
    /// Records dropped by the level filter
    filtered: AtomicU64,
    /// Payloads rejected as malformed
    rejected: AtomicU64,
    /// Fan-out passes completed
    broadcasts: AtomicU64,
    /// Successful deliveries to consumer outboxes
    deliveries: AtomicU64,
    /// Consumers removed after a failed delivery
    pruned: AtomicU64,
    /// Last broadcast timestamp (Unix millis)
    last_broadcast_time: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot for export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub queued: u64,
    pub control: u64,
    pub filtered: u64,
    pub rejected: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
    pub pruned: u64,
    pub last_broadcast_time: u64,
    pub broadcast_rate: f64, // passes per second
    pub uptime_seconds: u64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            control: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
            last_broadcast_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_control(&self) {
        self.control.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed fan-out pass
    pub fn record_broadcast(&self, delivered: usize, pruned: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.pruned.fetch_add(pruned as u64, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_broadcast_time.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let broadcasts = self.broadcasts.load(Ordering::Relaxed);
        let uptime = self.start_time.elapsed().as_secs();
        let rate = if uptime > 0 {
            broadcasts as f64 / uptime as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            control: self.control.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            broadcasts,
            deliveries: self.deliveries.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            last_broadcast_time: self.last_broadcast_time.load(Ordering::Relaxed),
            broadcast_rate: rate,
            uptime_seconds: uptime,
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
