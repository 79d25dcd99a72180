//! Diagnostic logging
//!
//! Console output is controlled by `log.to_console`; without it only errors
//! reach stderr. When `log.dir` is set, every event is also written as JSON
//! to a daily rolling file `<dir>/log-fan.<date>`.
//!
//! Events use one target per concern:
//! - `producer` - producer sessions and submit decisions
//! - `consumer` - consumer sessions and registry changes
//! - `dispatch` - fan-out passes
//! - `api` - HTTP server

use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::infrastructure::config::LogConfig;

/// Initialize logging
///
/// Returns the file writer guards, which must be kept alive for the duration
/// of the program.
///
/// # Errors
/// Returns error if the log directory cannot be created.
pub fn init_logging(config: &LogConfig) -> std::io::Result<Vec<WorkerGuard>> {
    let mut guards = Vec::new();

    let file_layer = if let Some(dir) = config.file_dir() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let (appender, guard) = create_appender(&dir.to_string_lossy(), "log-fan");
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .json(),
        )
    } else {
        None
    };

    let console_level = if config.to_console {
        LevelFilter::TRACE
    } else {
        LevelFilter::ERROR
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(env_filter(&config.filter))
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Logging system initialized");

    Ok(guards)
}

/// `RUST_LOG` wins over the configured directive; bad directives fall back to info
fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Create a rolling file appender
fn create_appender(dir: &str, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    (non_blocking, guard)
}

/// Log macro helpers for specific targets
#[macro_export]
macro_rules! log_producer {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "producer", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_consumer {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "consumer", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_dispatch {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "dispatch", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_api {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "api", $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_configured_directive() {
        assert!(EnvFilter::try_new("log_fan=debug,info").is_ok());
        // never panics, even on garbage
        let _ = env_filter("not a [valid directive");
    }

    #[test]
    fn test_appender_writes_into_directory() {
        let test_dir = std::env::temp_dir().join(format!("log-fan-logs-{}", std::process::id()));
        fs::create_dir_all(&test_dir).unwrap();

        let (_writer, guard) = create_appender(&test_dir.to_string_lossy(), "log-fan");
        drop(guard);
        assert!(test_dir.exists());

        fs::remove_dir_all(&test_dir).ok();
    }
}
