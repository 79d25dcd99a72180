//! Minimum severity threshold
//!
//! Set once at startup and read on every submit. Rejection is a silent drop,
//! never an error for the producer.

use crate::core::message::{Envelope, Level};

/// Threshold predicate over record severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelFilter {
    threshold: Level,
}

impl LevelFilter {
    pub fn new(threshold: Level) -> Self {
        Self { threshold }
    }

    /// Build from the configured integer, `None` when outside `0..=3`
    pub fn from_raw(raw: i64) -> Option<Self> {
        Level::from_raw(raw).map(Self::new)
    }

    #[inline(always)]
    pub fn threshold(&self) -> Level {
        self.threshold
    }

    #[inline(always)]
    pub fn accept(&self, level: Level) -> bool {
        level >= self.threshold
    }

    /// Control messages always pass
    #[inline]
    pub fn admits(&self, envelope: &Envelope) -> bool {
        match envelope {
            Envelope::ClearOnStart | Envelope::ClearOnFinish => true,
            Envelope::Record(record) => self.accept(record.level),
        }
    }
}
