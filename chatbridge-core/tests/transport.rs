//! Integration tests: the transport client against a real WebSocket
//! server on localhost: handshake, ordering, control frames, reconnect
//! and shutdown.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chatbridge_core::{
    BackoffPolicy, BridgeClient, ClientConfig, Diagnostics, codec, OutboundMessage,
};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

// ── Helpers ──────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingDiagnostics {
    echo: Mutex<Vec<String>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn echo(&self, line: &str) {
        self.echo.lock().unwrap().push(line.to_string());
    }

    fn log(&self, _line: &str) {}
}

/// Bind a listener on an OS-assigned port and return it with its URL.
async fn ephemeral_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}"))
}

fn fast_config(url: &str, secret: &str) -> ClientConfig {
    ClientConfig {
        backoff: BackoffPolicy {
            initial: Duration::from_millis(50),
            max: Duration::from_millis(200),
        },
        ..ClientConfig::new(url, secret)
    }
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("timeout waiting for client")
        .unwrap();
    accept_async(stream).await.unwrap()
}

/// Next text frame, skipping control frames.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    let read = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("timeout waiting for frame")
}

/// Wait for the server side to see the client close the socket.
async fn wait_closed(ws: &mut WebSocketStream<TcpStream>) {
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client never closed the connection");
}

/// Accept one TCP connection and drop it before the upgrade, so the
/// client's attempt fails ahead of the handshake. Returns when it was
/// accepted.
async fn refuse_upgrade(listener: &TcpListener) -> Instant {
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("timeout waiting for client")
        .unwrap();
    let at = Instant::now();
    drop(stream);
    at
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn command(name: &str, args: &[&str]) -> OutboundMessage {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    codec::build_command(name, &args)
}

// ── Handshake and ordering ───────────────────────────────────────

#[tokio::test]
async fn test_hello_is_first_frame() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, "s3cret"));

    // Queued before the connection exists.
    client.send(command("come", &["10", "64", "-5"]));
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"hello","v":1,"secret":"s3cret"}"#);
    assert_eq!(
        next_text(&mut ws).await,
        r#"{"type":"command","v":1,"name":"come","args":["10","64","-5"]}"#
    );
    assert!(client.is_connected());

    client.stop().await;
}

#[tokio::test]
async fn test_hello_without_secret() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"hello","v":1}"#);

    client.stop().await;
}

#[tokio::test]
async fn test_messages_arrive_in_fifo_order() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    next_text(&mut ws).await; // hello

    for i in 0..20 {
        client.send(command("mine", &[&i.to_string()]));
    }
    for i in 0..20 {
        let text = next_text(&mut ws).await;
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["args"][0], i.to_string());
    }

    client.stop().await;
}

// ── Control frames ───────────────────────────────────────────────

#[tokio::test]
async fn test_error_frame_surfaces_and_connection_stays_open() {
    let (listener, url) = ephemeral_server().await;
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let client = BridgeClient::with_diagnostics(fast_config(&url, ""), diagnostics.clone());
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    next_text(&mut ws).await; // hello

    ws.send(Message::Text(r#"{"type":"ack"}"#.into())).await.unwrap();
    ws.send(Message::Text("{not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"type":"mystery"}"#.into())).await.unwrap();
    ws.send(Message::Text(
        r#"{"type":"error","code":"bad_secret","message":"denied"}"#.into(),
    ))
    .await
    .unwrap();

    wait_until(|| !diagnostics.echo.lock().unwrap().is_empty()).await;
    {
        let echo = diagnostics.echo.lock().unwrap();
        assert_eq!(echo.len(), 1);
        assert!(echo[0].contains("bad_secret"));
        assert!(echo[0].contains("denied"));
    }

    // Same connection still carries traffic.
    client.send(command("follow", &[]));
    assert_eq!(next_text(&mut ws).await, r#"{"type":"command","v":1,"name":"follow"}"#);
    assert!(client.is_connected());

    client.stop().await;
}

// ── Reconnect ────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, "k"));
    client.start().unwrap();

    let mut first = accept(&listener).await;
    next_text(&mut first).await;
    wait_until(|| client.is_connected()).await;
    drop(first);

    // A fresh connection repeats the handshake.
    let mut second = accept(&listener).await;
    assert_eq!(next_text(&mut second).await, r#"{"type":"hello","v":1,"secret":"k"}"#);

    client.send(command("hello", &[]));
    assert_eq!(next_text(&mut second).await, r#"{"type":"command","v":1,"name":"hello"}"#);

    client.stop().await;
}

#[tokio::test]
async fn test_oversized_frame_triggers_reconnect() {
    let (listener, url) = ephemeral_server().await;
    let config = ClientConfig {
        max_frame_size: 1024,
        ..fast_config(&url, "")
    };
    let client = BridgeClient::new(config);
    client.start().unwrap();

    let mut first = accept(&listener).await;
    next_text(&mut first).await;
    let huge = format!(r#"{{"type":"ack","pad":"{}"}}"#, "x".repeat(4096));
    first.send(Message::Text(huge)).await.unwrap();

    let mut second = accept(&listener).await;
    assert_eq!(next_text(&mut second).await, r#"{"type":"hello","v":1}"#);

    client.stop().await;
}

#[tokio::test]
async fn test_connect_refused_keeps_retrying() {
    let (listener, url) = ephemeral_server().await;
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(client.is_running());
    assert!(!client.is_connected());

    // Endpoint comes up later; the client finds it.
    let listener = TcpListener::bind(addr).await.unwrap();
    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"hello","v":1}"#);

    client.stop().await;
}

#[tokio::test]
async fn test_reconnect_delays_double_then_reset_after_handshake() {
    let (listener, url) = ephemeral_server().await;
    let config = ClientConfig {
        sender_poll: Duration::from_millis(50),
        backoff: BackoffPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(800),
        },
        ..ClientConfig::new(&url, "")
    };
    let client = BridgeClient::new(config);
    client.start().unwrap();

    let mut attempts = Vec::new();
    for _ in 0..6 {
        attempts.push(refuse_upgrade(&listener).await);
    }
    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
    for (gap, expected_ms) in gaps.iter().zip([100u64, 200, 400, 800, 800]) {
        let floor = Duration::from_millis(expected_ms * 9 / 10);
        assert!(*gap >= floor, "waited {gap:?}, expected about {expected_ms}ms");
    }
    // Capped at the maximum rather than doubling to 1.6s.
    assert!(gaps[4] < Duration::from_millis(1400), "cap not applied: {:?}", gaps[4]);

    // A completed handshake puts the delay back to the floor.
    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"hello","v":1}"#);
    let dropped = Instant::now();
    drop(ws);

    refuse_upgrade(&listener).await;
    let gap = dropped.elapsed();
    assert!(gap >= Duration::from_millis(90), "reconnected too early: {gap:?}");
    assert!(gap < Duration::from_millis(600), "delay not reset: {gap:?}");

    client.stop().await;
}

// ── Non-blocking send and shutdown ───────────────────────────────

#[tokio::test]
async fn test_send_while_disconnected_returns_immediately() {
    let (listener, url) = ephemeral_server().await;
    drop(listener);

    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();

    let started = Instant::now();
    for i in 0..10_000 {
        client.send(command("mine", &[&i.to_string()]));
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!client.is_connected());

    client.stop().await;
}

#[tokio::test]
async fn test_dropped_client_stops_reconnecting() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    next_text(&mut ws).await;
    wait_until(|| client.is_connected()).await;

    drop(client);
    wait_closed(&mut ws).await;

    // fast_config would retry within 50ms if the lifecycle survived.
    let again = tokio::time::timeout(Duration::from_secs(1), listener.accept()).await;
    assert!(again.is_err(), "dropped client connected again");
}

#[tokio::test]
async fn test_stop_closes_connection_and_is_repeatable() {
    let (listener, url) = ephemeral_server().await;
    let client = BridgeClient::new(fast_config(&url, ""));
    client.start().unwrap();

    let mut ws = accept(&listener).await;
    next_text(&mut ws).await;
    wait_until(|| client.is_connected()).await;

    let stopping = Instant::now();
    client.stop().await;
    assert!(stopping.elapsed() < Duration::from_secs(2));
    assert!(!client.is_connected());
    assert!(!client.is_running());

    wait_closed(&mut ws).await;

    client.stop().await;
    assert!(!client.is_connected());

    // And the client can be started again.
    client.start().unwrap();
    let mut again = accept(&listener).await;
    assert_eq!(next_text(&mut again).await, r#"{"type":"hello","v":1}"#);
    client.stop().await;
}
