use futures_util::{SinkExt, StreamExt};
use inkroom_server::{AppState, serve_on};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> (SocketAddr, Arc<AppState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new(64));
    tokio::spawn(serve_on(listener, state.clone()));
    (addr, state)
}

async fn join(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

/// Next text frame, or `None` if nothing arrives in time.
async fn next_text(client: &mut Client, wait: Duration) -> Option<String> {
    loop {
        match timeout(wait, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text.as_str().to_owned()),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

async fn wait_for_peers(state: &AppState, count: usize) {
    for _ in 0..200 {
        if state.peer_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} peers, have {}", count, state.peer_count());
}

#[tokio::test]
async fn test_draw_reaches_connected_peers_only() {
    let (addr, state) = start_relay().await;
    let mut a = join(addr).await;
    let mut b = join(addr).await;
    wait_for_peers(&state, 2).await;

    let frame = r#"{"type":"draw","data":{"op":"create","entity":{"kind":"circle","id":"x"}}}"#;
    a.send(Message::text(frame)).await.unwrap();
    assert_eq!(next_text(&mut b, Duration::from_secs(5)).await.as_deref(), Some(frame));

    let mut c = join(addr).await;
    wait_for_peers(&state, 3).await;
    assert_eq!(next_text(&mut c, Duration::from_millis(300)).await, None);
}

#[tokio::test]
async fn test_sender_gets_no_echo() {
    let (addr, state) = start_relay().await;
    let mut a = join(addr).await;
    let mut b = join(addr).await;
    wait_for_peers(&state, 2).await;

    a.send(Message::text(r#"{"type":"draw","data":1}"#)).await.unwrap();
    assert!(next_text(&mut b, Duration::from_secs(5)).await.is_some());
    assert_eq!(next_text(&mut a, Duration::from_millis(300)).await, None);
}

#[tokio::test]
async fn test_invalid_frame_gets_error_and_is_not_forwarded() {
    let (addr, state) = start_relay().await;
    let mut a = join(addr).await;
    let mut b = join(addr).await;
    wait_for_peers(&state, 2).await;

    a.send(Message::text(r#"{"type":"chat","text":"hi"}"#)).await.unwrap();
    let reply = next_text(&mut a, Duration::from_secs(5)).await.unwrap();
    let reply: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().starts_with("Invalid message"));
    assert_eq!(next_text(&mut b, Duration::from_millis(300)).await, None);
}

#[tokio::test]
async fn test_disconnect_removes_peer() {
    let (addr, state) = start_relay().await;
    let mut a = join(addr).await;
    wait_for_peers(&state, 1).await;
    a.close(None).await.unwrap();
    wait_for_peers(&state, 0).await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _) = start_relay().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}
