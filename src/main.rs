//! Real-time log fan-out relay
//!
//! # Architecture
//! - **core**: log record model and level filter
//! - **fanout**: registry, inbound queue, dispatcher, relay context
//! - **ws**: producer and consumer WebSocket sessions
//! - **infrastructure**: server, config, logging, metrics

use log_fan::fanout::{Dispatcher, Relay};
use log_fan::infrastructure::{api, browser, config::Config, logging};
use log_fan::Result;
use std::sync::Arc;

/// Main application state
pub struct RelayApp {
    config: Config,
}

impl RelayApp {
    /// Create new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bind, start the dispatcher and serve until the listener fails
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting log fan-out relay...");

        // 1. Core: relay context and its single dispatcher
        let filter = self.config.level_filter()?;
        let (relay, dispatcher): (Relay, Dispatcher<_>) =
            Relay::new(filter, self.config.relay.queue_capacity);
        let relay = Arc::new(relay);
        dispatcher.spawn();
        tracing::info!("Forwarding records at level {} and above", filter.threshold());

        // 2. Bind (fatal on failure)
        let listener = api::bind(self.config.server.address.as_str()).await?;

        // 3. Optional browser launch at the static home page
        let static_dir = self.config.static_dir();
        if self.config.server.open_browser && static_dir.is_some() {
            let url = self.config.home_url();
            if let Err(e) = browser::open(&url) {
                tracing::warn!("Failed to open browser at {}: {}", url, e);
            }
        }

        // 4. Serve
        let state = api::AppState {
            relay,
            outbox_capacity: self.config.relay.outbox_capacity,
        };
        api::serve(listener, api::router(state, static_dir)).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Guards flush file logs on exit
    let _guards = logging::init_logging(&config.log)?;

    let app = RelayApp::new(config);
    app.run().await
}
