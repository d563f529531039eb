//! Shared harness for integration tests: starts a real server on a random
//! port with a tempdir database and drives it with tokio-tungstenite
//! WebSocket clients.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use huddle_server::routes;
use huddle_server::state::AppState;
use huddle_server::store::models::{MessageStatus, OnlineStatus, Reaction};
use huddle_server::store::{self, queries, DbPool};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub db: DbPool,
    _tmp: tempfile::TempDir,
}

/// Start the server on a random port with a fresh tempdir database.
pub async fn start_server() -> TestServer {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp.path().to_str().unwrap().to_string();

    let db = store::init_db(&data_dir).expect("Failed to init DB");
    let state = AppState::new(db.clone());
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        db,
        _tmp: tmp,
    }
}

// --- Store seeding (the HTTP layer's job in production) ---

pub fn seed_user(server: &TestServer, id: &str, status: OnlineStatus) {
    let conn = server.db.lock().unwrap();
    queries::set_user_status(&conn, id, status).unwrap();
}

pub fn seed_direct_conversation(server: &TestServer, a: &str, b: &str) -> String {
    let conn = server.db.lock().unwrap();
    queries::create_conversation(&conn, false, None, &[a.to_string(), b.to_string()]).unwrap()
}

pub fn seed_group(server: &TestServer, name: &str, participants: &[&str]) -> String {
    let conn = server.db.lock().unwrap();
    let ids: Vec<String> = participants.iter().map(|p| p.to_string()).collect();
    queries::create_conversation(&conn, true, Some(name), &ids).unwrap()
}

pub fn seed_message(server: &TestServer, conversation_id: &str, sender: &str, body: &str) -> String {
    let conn = server.db.lock().unwrap();
    queries::create_message(&conn, conversation_id, sender, Some(body), None).unwrap()
}

pub fn message_status(server: &TestServer, message_id: &str) -> Option<MessageStatus> {
    let conn = server.db.lock().unwrap();
    queries::message_status(&conn, message_id).unwrap()
}

pub fn reactions(server: &TestServer, message_id: &str) -> Vec<Reaction> {
    let conn = server.db.lock().unwrap();
    queries::reactions_for_message(&conn, message_id).unwrap()
}

/// Poll the store until the message reaches the expected status (pushes are
/// optimistic, so the durable write trails the live event).
pub async fn wait_message_status(server: &TestServer, message_id: &str, expected: MessageStatus) {
    for _ in 0..40 {
        if message_status(server, message_id) == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "Message {} never reached {:?} (currently {:?})",
        message_id,
        expected,
        message_status(server, message_id)
    );
}

// --- WebSocket client helpers ---

pub async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::Text(event.to_string()))
        .await
        .expect("Failed to send event");
}

/// Receive the next JSON frame within `timeout`, skipping non-text frames.
pub async fn recv_json(ws: &mut WsClient, timeout: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return None;
        }
        match tokio::time::timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return serde_json::from_str(&text).ok(),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

/// Wait for the next event with the given name, skipping unrelated events
/// (online-users rebroadcasts arrive interleaved with everything else).
pub async fn recv_event(ws: &mut WsClient, name: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match recv_json(ws, remaining).await {
            Some(value) if value["event"] == name => return value,
            Some(_) => continue,
            None => panic!("Timed out waiting for {name} event"),
        }
    }
}

/// Assert that no event with the given name arrives within `window`.
pub async fn expect_no_event(ws: &mut WsClient, name: &str, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match recv_json(ws, remaining).await {
            Some(value) => {
                assert_ne!(value["event"], name, "Unexpected {name} event: {value}");
            }
            None => return,
        }
    }
}

/// Announce a user and wait for the resulting online-users broadcast, so the
/// registry update is observable before the test proceeds. Tests connect and
/// announce clients strictly one after another to keep broadcasts
/// attributable.
pub async fn announce(ws: &mut WsClient, user_id: &str) {
    send_event(ws, json!({"event": "announce", "user_id": user_id})).await;
    recv_event(ws, "online-users").await;
}

/// Keep reading online-users broadcasts until one satisfies the predicate.
pub async fn wait_online_users<F>(ws: &mut WsClient, pred: F) -> Vec<String>
where
    F: Fn(&[String]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    let mut last: Option<Vec<String>> = None;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            panic!("No matching online-users broadcast (last seen: {last:?})");
        }
        match recv_json(ws, remaining).await {
            Some(value) if value["event"] == "online-users" => {
                let users: Vec<String> = value["users"]
                    .as_array()
                    .map(|list| {
                        list.iter()
                            .filter_map(|u| u.as_str().map(|s| s.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                if pred(&users) {
                    return users;
                }
                last = Some(users);
            }
            Some(_) => continue,
            None => panic!("No matching online-users broadcast (last seen: {last:?})"),
        }
    }
}
