//! Producer sessions
//!
//! Every text or binary frame is one payload for `Relay::submit`. Malformed
//! payloads get an error reply on the same connection, which stays open.

use axum::extract::ws::{Message, WebSocket};
use serde_json::json;
use std::sync::Arc;
use tracing::Level;

use crate::fanout::{Relay, SubmitError};

/// Error text sent back for malformed payloads
pub const FORMAT_ERROR: &str = "Message did not abide by the proper format.";

/// Reply sent to a producer whose payload could not be parsed
///
/// The offending payload is echoed back as (lossy) UTF-8 text.
pub fn format_error_reply(raw: &[u8]) -> String {
    json!({
        "error": FORMAT_ERROR,
        "message": String::from_utf8_lossy(raw),
    })
    .to_string()
}

/// Drive one producer connection until it closes
pub async fn run_producer(mut socket: WebSocket, relay: Arc<Relay>) {
    crate::log_producer!(Level::INFO, "Producer connected");

    while let Some(frame) = socket.recv().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                crate::log_producer!(Level::WARN, error = %e, "Producer read failed");
                break;
            }
        };

        crate::log_producer!(Level::TRACE, payload = %String::from_utf8_lossy(&payload), "recv");

        match relay.submit(&payload).await {
            Ok(outcome) => {
                crate::log_producer!(Level::TRACE, ?outcome, "Payload accepted");
            }
            Err(SubmitError::Format(e)) => {
                crate::log_producer!(Level::DEBUG, error = %e, "Rejected malformed payload");
                let reply = format_error_reply(&payload);
                if let Err(e) = socket.send(Message::Text(reply)).await {
                    crate::log_producer!(Level::WARN, error = %e, "Failed to send format error");
                    break;
                }
            }
            Err(e @ SubmitError::QueueClosed(_)) => {
                crate::log_producer!(Level::WARN, error = %e, "Relay shutting down");
                break;
            }
        }
    }

    crate::log_producer!(Level::INFO, "Producer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_format_error_reply_echoes_payload() {
        let value: Value = serde_json::from_str(&format_error_reply(b"not json")).unwrap();
        assert_eq!(value["error"], FORMAT_ERROR);
        assert_eq!(value["message"], "not json");
    }

    #[test]
    fn test_format_error_reply_escapes_quotes() {
        let raw = br#"{"content":"oops"#;
        let value: Value = serde_json::from_str(&format_error_reply(raw)).unwrap();
        assert_eq!(value["message"], r#"{"content":"oops"#);
    }

    #[test]
    fn test_format_error_reply_lossy_utf8() {
        let value: Value = serde_json::from_str(&format_error_reply(&[0x66, 0xff, 0x6f])).unwrap();
        assert_eq!(value["message"], "f\u{fffd}o");
    }
}
