//! End-to-end tests over real WebSocket connections

use futures_util::{SinkExt, StreamExt};
use log_fan::fanout::{Dispatcher, Relay};
use log_fan::infrastructure::{api, AppState};
use log_fan::{Level, LevelFilter};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start(threshold: Level) -> (SocketAddr, Arc<Relay>) {
    let (relay, dispatcher): (Relay, Dispatcher<_>) = Relay::new(LevelFilter::new(threshold), 64);
    let relay = Arc::new(relay);
    dispatcher.spawn();

    let listener = api::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState {
        relay: relay.clone(),
        outbox_capacity: 64,
    };
    tokio::spawn(api::serve(listener, api::router(state, None)));
    (addr, relay)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    client
}

/// Connect a consumer and wait until the relay has registered it
async fn consumer(addr: SocketAddr, relay: &Relay, expected: usize) -> Client {
    let client = connect(addr, "/rec").await;
    timeout(WAIT, async {
        while relay.registry().len() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_record_fans_out_to_all_consumers() {
    let (addr, relay) = start(Level::Debug).await;
    let mut first = consumer(addr, &relay, 1).await;
    let mut second = consumer(addr, &relay, 2).await;
    let mut producer = connect(addr, "/send").await;

    producer
        .send(Message::Text(r#"{"content":"boot","level":5,"line_num":9}"#.to_string()))
        .await
        .unwrap();

    for client in [&mut first, &mut second] {
        let value = next_json(client).await;
        assert_eq!(value["content"], "boot");
        assert_eq!(value["level"], 3);
        assert_eq!(value["line_num"], 9);
        assert_eq!(value["column_num"], -1);
        assert_eq!(value["file_name"], "");
    }
}

#[tokio::test]
async fn test_malformed_payload_gets_error_reply() {
    let (addr, relay) = start(Level::Debug).await;
    let mut listener = consumer(addr, &relay, 1).await;
    let mut producer = connect(addr, "/send").await;

    producer.send(Message::Text("not json".to_string())).await.unwrap();
    let reply = next_json(&mut producer).await;
    assert_eq!(reply["message"], "not json");
    assert!(reply["error"].as_str().is_some());

    // connection stays open and the next valid record still flows
    producer
        .send(Message::Text(r#"{"content":"after"}"#.to_string()))
        .await
        .unwrap();
    let value = next_json(&mut listener).await;
    assert_eq!(value["content"], "after");
    assert_eq!(relay.metrics().snapshot().rejected, 1);
}

#[tokio::test]
async fn test_threshold_and_control_messages() {
    let (addr, relay) = start(Level::Warn).await;
    let mut listener = consumer(addr, &relay, 1).await;
    let mut producer = connect(addr, "/send").await;

    producer.send(Message::Text("clears".to_string())).await.unwrap();
    producer
        .send(Message::Text(r#"{"content":"quiet","level":1}"#.to_string()))
        .await
        .unwrap();
    producer
        .send(Message::Text(r#"{"content":"loud","level":2}"#.to_string()))
        .await
        .unwrap();
    producer.send(Message::Text("clearf".to_string())).await.unwrap();

    assert_eq!(next_json(&mut listener).await["level"], -2);
    let value = next_json(&mut listener).await;
    assert_eq!(value["content"], "loud");
    assert_eq!(value["level"], 2);
    assert_eq!(next_json(&mut listener).await["level"], -1);
}

#[tokio::test]
async fn test_close_command_unregisters_consumer() {
    let (addr, relay) = start(Level::Debug).await;
    let mut leaving = consumer(addr, &relay, 1).await;
    let mut staying = consumer(addr, &relay, 2).await;

    leaving.send(Message::Text("close".to_string())).await.unwrap();
    timeout(WAIT, async {
        while relay.registry().len() != 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let mut producer = connect(addr, "/send").await;
    producer
        .send(Message::Text(r#"{"content":"still here"}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut staying).await["content"], "still here");
}

#[tokio::test]
async fn test_dropped_consumer_is_removed() {
    let (addr, relay) = start(Level::Debug).await;
    let gone = consumer(addr, &relay, 1).await;
    let mut alive = consumer(addr, &relay, 2).await;

    drop(gone);
    let mut producer = connect(addr, "/send").await;

    // keep broadcasting until the dead consumer has been noticed
    timeout(WAIT, async {
        let mut n = 0;
        while relay.registry().len() != 1 {
            producer
                .send(Message::Text(format!(r#"{{"content":"tick {}"}}"#, n)))
                .await
                .unwrap();
            n += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let value = next_json(&mut alive).await;
    assert!(value["content"].as_str().unwrap().starts_with("tick"));
}
