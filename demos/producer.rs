use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, SystemTime};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

#[tokio::main]
async fn main() {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:9000/send".to_string());
    println!("Connecting to {}...", url);

    let (mut ws_stream, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    println!("Connected!");

    ws_stream.send(Message::Text("clears".to_string())).await.expect("Failed to send");

    for (i, level) in [0, 1, 2, 3, 7].into_iter().enumerate() {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        let record = serde_json::json!({
            "time": now,
            "content": format!("demo record {}", i),
            "logger_name": "demo",
            "file_name": file!(),
            "line_num": line!(),
            "column_num": column!(),
            "level": level,
        });
        ws_stream.send(Message::Text(record.to_string())).await.expect("Failed to send");
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    // Malformed on purpose, the relay answers with an error payload
    ws_stream.send(Message::Text("not json".to_string())).await.expect("Failed to send");
    if let Some(Ok(reply)) = ws_stream.next().await {
        println!("Relay replied: {:?}", reply);
    }

    ws_stream.send(Message::Text("clearf".to_string())).await.expect("Failed to send");
    ws_stream.close(None).await.ok();
    println!("Connection closed");
}
