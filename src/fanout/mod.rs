//! Fan-out engine: registry, inbound queue, dispatcher and the relay context
//!
//! The registry lock is the only shared mutable state between sessions and
//! the dispatcher.

pub mod dispatcher;
pub mod queue;
pub mod registry;
pub mod relay;

pub use dispatcher::{BroadcastReport, Dispatcher};
pub use queue::{QueueClosed, QueueReceiver, QueueSender, DEFAULT_QUEUE_CAPACITY};
pub use registry::{ConnectionRegistry, ConsumerConnection, Handle, Verdict};
pub use relay::{Relay, SubmitError, SubmitOutcome};
