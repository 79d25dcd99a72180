//! WebSocket sessions for producers and consumers

pub mod consumer;
pub mod outbox;
pub mod producer;

pub use consumer::{run_consumer, ConsumerFrame, CLOSE_COMMAND};
pub use outbox::{outbox, Outbox, OutboxReceiver, TransportError, DEFAULT_OUTBOX_CAPACITY};
pub use producer::{format_error_reply, run_producer, FORMAT_ERROR};
