use std::sync::Arc;

use crate::hub::presence::PresenceRegistry;
use crate::hub::rooms::RoomIndex;
use crate::store::DbPool;
use crate::ws::{self, ConnectionRegistry};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex> — the persistence collaborator
    pub db: DbPool,
    /// Every live WebSocket connection, bound to a user or not
    pub connections: ConnectionRegistry,
    /// userId -> live connection handle (at most one per user)
    pub presence: Arc<PresenceRegistry>,
    /// group conversation id -> currently-joined connections
    pub rooms: Arc<RoomIndex>,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            connections: ws::new_connection_registry(),
            presence: Arc::new(PresenceRegistry::new()),
            rooms: Arc::new(RoomIndex::new()),
        }
    }
}
