//! Infrastructure around the fan-out core
//!
//! This module contains the outer surfaces:
//! - HTTP server and static files
//! - Configuration management
//! - Logging and metrics
//! - Browser launch at startup

pub mod api;
pub mod browser;
pub mod config;
pub mod logging;
pub mod metrics;

pub use api::{bind, router, serve, AppState, StatsDto};
pub use metrics::{MetricsSnapshot, RelayMetrics};
