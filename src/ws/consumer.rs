//! Consumer sessions
//!
//! A consumer only receives. Its reader half exists to notice the peer
//! leaving (close frame, read error, or the textual `close` command); all
//! outbound traffic comes from the dispatcher through the outbox.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::Level;

use crate::fanout::{Handle, Relay};
use crate::ws::outbox::{outbox, OutboxReceiver};

/// Inbound text that ends a consumer session
pub const CLOSE_COMMAND: &str = "close";

/// Meaning of a frame received from a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerFrame {
    /// The consumer wants the session ended
    Close,
    /// Anything else; logged and ignored
    Inert,
}

impl ConsumerFrame {
    pub fn inspect(msg: &Message) -> Self {
        match msg {
            Message::Text(text) if text == CLOSE_COMMAND => ConsumerFrame::Close,
            Message::Binary(bytes) if bytes == CLOSE_COMMAND.as_bytes() => ConsumerFrame::Close,
            Message::Close(_) => ConsumerFrame::Close,
            _ => ConsumerFrame::Inert,
        }
    }
}

/// Drive one consumer connection until it closes
pub async fn run_consumer(socket: WebSocket, relay: Arc<Relay>, outbox_capacity: usize) {
    let (sink, mut stream) = socket.split();
    let (outbox, pending) = outbox(outbox_capacity);
    let handle = relay.register_consumer(outbox);
    let writer = tokio::spawn(write_loop(sink, pending, handle));

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(msg) => match ConsumerFrame::inspect(&msg) {
                ConsumerFrame::Close => {
                    crate::log_consumer!(Level::INFO, %handle, "Consumer requested close");
                    break;
                }
                ConsumerFrame::Inert => {
                    crate::log_consumer!(Level::DEBUG, %handle, frame = ?msg, "Ignoring consumer frame");
                }
            },
            Err(e) => {
                crate::log_consumer!(Level::WARN, %handle, error = %e, "Consumer read failed");
                break;
            }
        }
    }

    // Closing the outbox lets the writer flush what is pending and send a close frame
    relay.unregister_consumer(handle);
    if let Err(e) = writer.await {
        crate::log_consumer!(Level::ERROR, %handle, error = %e, "Consumer writer task failed");
    }
}

/// Drain the outbox onto the socket until either side goes away
async fn write_loop<S>(mut sink: S, mut pending: OutboxReceiver, handle: Handle)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(payload) = pending.recv().await {
        if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
            // Dropping `pending` makes the next delivery fail, which prunes this consumer
            crate::log_consumer!(Level::WARN, %handle, error = %e, "Consumer write failed");
            return;
        }
    }
    if let Err(e) = sink.send(Message::Close(None)).await {
        crate::log_consumer!(Level::DEBUG, %handle, error = %e, "Consumer close frame not sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::ConsumerConnection;
    use parking_lot::Mutex;

    #[test]
    fn test_close_command_ends_session() {
        assert_eq!(ConsumerFrame::inspect(&Message::Text("close".to_string())), ConsumerFrame::Close);
        assert_eq!(ConsumerFrame::inspect(&Message::Binary(b"close".to_vec())), ConsumerFrame::Close);
        assert_eq!(ConsumerFrame::inspect(&Message::Close(None)), ConsumerFrame::Close);
    }

    #[test]
    fn test_other_frames_are_inert() {
        assert_eq!(ConsumerFrame::inspect(&Message::Text("Close".to_string())), ConsumerFrame::Inert);
        assert_eq!(ConsumerFrame::inspect(&Message::Text("close ".to_string())), ConsumerFrame::Inert);
        assert_eq!(ConsumerFrame::inspect(&Message::Text("{}".to_string())), ConsumerFrame::Inert);
        assert_eq!(ConsumerFrame::inspect(&Message::Ping(vec![1])), ConsumerFrame::Inert);
    }

    #[tokio::test]
    async fn test_writer_flushes_outbox_despite_failed_close_frame() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let log = written.clone();
        let sink = Box::pin(futures_util::sink::unfold((), move |(), msg: Message| {
            let log = log.clone();
            async move {
                if let Message::Close(_) = msg {
                    return Err("peer already gone");
                }
                log.lock().push(msg);
                Ok(())
            }
        }));

        let (tx, pending) = outbox(4);
        tx.deliver(&Arc::from("a")).unwrap();
        tx.deliver(&Arc::from("b")).unwrap();
        tx.close();

        write_loop(sink, pending, Handle(1)).await;
        assert_eq!(
            *written.lock(),
            vec![Message::Text("a".to_string()), Message::Text("b".to_string())]
        );
    }
}
