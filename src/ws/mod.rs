pub mod actor;
pub mod handler;
pub mod protocol;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::ws::protocol::ServerEvent;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one live push channel: a process-unique id plus the sender half
/// of the connection's outbound queue. Cheap to clone; every registry
/// (presence, rooms, connections) stores clones of the same handle.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: u64,
    tx: ConnectionSender,
}

impl ConnectionHandle {
    pub fn new(tx: ConnectionSender) -> Self {
        Self {
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Serialize a server event and queue it on this connection.
    /// The transport is fire-and-forget: a closed connection drops the event.
    pub fn send(&self, event: &ServerEvent) {
        if let Ok(text) = serde_json::to_string(event) {
            let _ = self.tx.send(axum::extract::ws::Message::Text(text.into()));
        }
    }

    /// Queue an already-encoded frame (used by room broadcast to serialize once).
    pub fn send_text(&self, text: &str) {
        let _ = self
            .tx
            .send(axum::extract::ws::Message::Text(text.to_string().into()));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Connection registry: every live WebSocket connection keyed by its id,
/// bound to a user or not. Used for full broadcasts (online-users list).
pub type ConnectionRegistry = Arc<DashMap<u64, ConnectionHandle>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

/// Broadcast a server event to every live connection.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(_) => return,
    };
    for entry in registry.iter() {
        entry.value().send_text(&text);
    }
}
