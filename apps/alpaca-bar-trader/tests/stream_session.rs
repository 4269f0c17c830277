//! Stream Session Integration Tests
//!
//! Runs the full client lifecycle against an in-process WebSocket server
//! that speaks the Alpaca crypto stream dialect.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use alpaca_bar_trader::{
    BarStreamClient, BarStreamConfig, ClientEvent, ConnectionPhase, Credentials, FixedSellPolicy,
    OrderAccumulator, TlsSettings,
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames the fake server received, forwarded for assertions.
type ReceivedFrames = mpsc::UnboundedReceiver<Value>;

/// Start a fake Alpaca bar stream server on a random port.
///
/// The server speaks the v1beta3 dialect: a connected banner on accept,
/// an authenticated ack for auth frames, a subscription ack for
/// subscribe/unsubscribe frames, and one batch of two bars right after
/// the first subscribe ack.
async fn spawn_fake_stream_server() -> (String, ReceivedFrames, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        ws.send(Message::Text(
            json!([{"T": "success", "msg": "connected"}]).to_string().into(),
        ))
        .await
        .unwrap();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                if matches!(message, Message::Close(_)) {
                    break;
                }
                continue;
            };

            let frame: Value = serde_json::from_str(&text).unwrap();
            let action = frame["action"].as_str().unwrap_or_default().to_string();
            let _ = frame_tx.send(frame);

            match action.as_str() {
                "auth" => {
                    ws.send(Message::Text(
                        json!([{"T": "success", "msg": "authenticated"}])
                            .to_string()
                            .into(),
                    ))
                    .await
                    .unwrap();
                }
                "subscribe" => {
                    ws.send(Message::Text(
                        json!([{"T": "subscription", "bars": ["BTCUSD", "ETHUSD"]}])
                            .to_string()
                            .into(),
                    ))
                    .await
                    .unwrap();
                    // A binary and an empty text frame precede the bars;
                    // both must be filtered without producing events.
                    ws.send(Message::Binary(vec![0x01, 0x02, 0x03].into()))
                        .await
                        .unwrap();
                    ws.send(Message::Text(String::new().into())).await.unwrap();
                    ws.send(Message::Text(
                        json!([
                            {"T": "b", "S": "BTCUSD", "o": 50_000.0, "h": 50_100.0,
                             "l": 49_900.0, "c": 50_050.0, "v": 12.5,
                             "t": "2024-01-01T00:01:00Z", "n": 42, "vw": 50_025.0},
                            {"T": "b", "S": "ETHUSD", "o": 3_000.0, "h": 3_010.0,
                             "l": 2_990.0, "c": 3_005.0, "v": 100.0,
                             "t": "2024-01-01T00:01:00Z", "n": 17, "vw": 3_002.5}
                        ])
                        .to_string()
                        .into(),
                    ))
                    .await
                    .unwrap();
                }
                "unsubscribe" => {
                    ws.send(Message::Text(
                        json!([{"T": "subscription", "bars": []}]).to_string().into(),
                    ))
                    .await
                    .unwrap();
                }
                _ => {}
            }
        }
    });

    (format!("ws://{addr}"), frame_rx, handle)
}

fn build_client(
    accumulator: Arc<OrderAccumulator>,
) -> (BarStreamClient, mpsc::Receiver<ClientEvent>) {
    let (event_tx, event_rx) = mpsc::channel(64);
    let client = BarStreamClient::new(
        BarStreamConfig {
            credentials: Credentials::new("test-key".to_string(), "test-secret".to_string()),
            tls: TlsSettings::default(),
            dispatch_pool_size: 2,
        },
        Arc::new(FixedSellPolicy),
        accumulator,
        event_tx,
    );
    (client, event_rx)
}

async fn next_event(event_rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    timeout(EVENT_TIMEOUT, event_rx.recv())
        .await
        .expect("timed out waiting for lifecycle event")
        .expect("event channel closed")
}

#[tokio::test]
async fn full_session_lifecycle() {
    let (url, mut received, server) = spawn_fake_stream_server().await;
    let accumulator = Arc::new(OrderAccumulator::new());
    let (client, mut event_rx) = build_client(Arc::clone(&accumulator));

    client.connect(&url).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Connected);
    assert_eq!(client.phase(), ConnectionPhase::Open);

    client.authenticate().unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Authenticated);

    let auth_frame = received.recv().await.unwrap();
    assert_eq!(auth_frame["action"], "auth");
    assert_eq!(auth_frame["key"], "test-key");
    assert_eq!(auth_frame["secret"], "test-secret");

    let symbols = vec!["BTCUSD".to_string(), "ETHUSD".to_string()];
    client.subscribe(&symbols).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Subscribed);

    let subscribe_frame = received.recv().await.unwrap();
    assert_eq!(subscribe_frame["action"], "subscribe");
    assert_eq!(subscribe_frame["bars"], json!(["BTCUSD", "ETHUSD"]));
    assert_eq!(client.subscriptions().len(), 2);

    // The bar batch follows the ack, behind a binary and an empty text
    // frame that the run loop filters out; poll until both orders have
    // landed.
    timeout(EVENT_TIMEOUT, async {
        while accumulator.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for derived orders");

    let orders = accumulator.drain();
    let mut derived: Vec<&str> = orders.iter().map(|o| o.symbol.as_str()).collect();
    derived.sort_unstable();
    assert_eq!(derived, ["BTC", "ETH"]);
    for order in &orders {
        assert_eq!(order.qty, "0.001");
        assert_eq!(order.side, "sell");
        assert_eq!(order.order_type, "market");
        assert_eq!(order.time_in_force, "gtc");
    }

    client.unsubscribe(&symbols).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Subscribed);
    assert!(client.subscriptions().is_empty());

    client.disconnect();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Disconnected);

    // Joining the dispatch pool guarantees no frame is still pending;
    // the filtered frames and drained bars left nothing behind.
    timeout(EVENT_TIMEOUT, client.join_dispatch())
        .await
        .expect("timed out joining dispatch pool");
    assert!(accumulator.is_empty());

    server.abort();
}

#[tokio::test]
async fn unsubscribe_of_never_subscribed_symbol_is_a_noop() {
    let (url, mut received, server) = spawn_fake_stream_server().await;
    let accumulator = Arc::new(OrderAccumulator::new());
    let (client, mut event_rx) = build_client(accumulator);

    client.connect(&url).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Connected);

    client.subscribe(&["BTCUSD".to_string()]).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Subscribed);
    let subscribe_frame = received.recv().await.unwrap();
    assert_eq!(subscribe_frame["action"], "subscribe");

    // DOGEUSD was never subscribed; the frame still goes out and the
    // tracked set is untouched.
    client.unsubscribe(&["DOGEUSD".to_string()]).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Subscribed);

    let unsubscribe_frame = received.recv().await.unwrap();
    assert_eq!(unsubscribe_frame["action"], "unsubscribe");
    assert_eq!(unsubscribe_frame["bars"], json!(["DOGEUSD"]));
    assert_eq!(
        client.subscriptions(),
        std::collections::HashSet::from(["BTCUSD".to_string()])
    );

    client.disconnect();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Disconnected);
    server.abort();
}

#[tokio::test]
async fn connect_twice_is_rejected() {
    let (url, _received, server) = spawn_fake_stream_server().await;
    let accumulator = Arc::new(OrderAccumulator::new());
    let (client, mut event_rx) = build_client(accumulator);

    client.connect(&url).unwrap();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Connected);

    let err = client.connect(&url).unwrap_err();
    assert!(matches!(
        err,
        alpaca_bar_trader::StreamClientError::AlreadyConnected
    ));

    client.disconnect();
    assert_eq!(next_event(&mut event_rx).await, ClientEvent::Disconnected);
    server.abort();
}

#[tokio::test]
async fn connection_refused_is_reported_as_failed() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let accumulator = Arc::new(OrderAccumulator::new());
    let (client, mut event_rx) = build_client(accumulator);

    client.connect(&format!("ws://{addr}")).unwrap();
    match next_event(&mut event_rx).await {
        ClientEvent::Failed(_) => {}
        other => panic!("expected Failed event, got {other:?}"),
    }
    assert_eq!(client.phase(), ConnectionPhase::Failed);
}
