//! Presence registry: which user currently holds a live push channel.
//!
//! In-process DashMap keyed by user id, at most one connection per user
//! (last announce wins). This module is the seam for multi-instance
//! deployments: swapping the backing store changes nothing in the callers.

use dashmap::DashMap;

use crate::hub::status;
use crate::state::AppState;
use crate::store::queries;
use crate::ws::ConnectionHandle;

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: DashMap<String, ConnectionHandle>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register or overwrite the mapping for a user. Idempotent; a second
    /// announce from a new connection silently replaces the old handle.
    /// The superseded connection is neither closed nor notified.
    pub fn announce(&self, user_id: &str, handle: ConnectionHandle) {
        self.entries.insert(user_id.to_string(), handle);
    }

    /// Look up the live connection for a user, if any. Absence means
    /// "not reachable for push" regardless of the durable status preference.
    pub fn resolve(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.entries.get(user_id).map(|entry| entry.value().clone())
    }

    /// Reverse-lookup removal on transport close. Scans current entries for
    /// the closing connection's id and deletes the entry only if that
    /// connection still owns it. Returns the owning user id when an entry
    /// was actually removed.
    pub fn remove(&self, handle: &ConnectionHandle) -> Option<String> {
        let owner = self
            .entries
            .iter()
            .find(|entry| entry.value().id == handle.id)
            .map(|entry| entry.key().clone())?;
        self.entries
            .remove_if(&owner, |_, stored| stored.id == handle.id)
            .map(|(user_id, _)| user_id)
    }

    /// Snapshot of all currently-present user ids.
    pub fn user_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Handle an `announce` event: bind the connection to the user, join the
/// user's group rooms, and rebroadcast the online list.
///
/// The group list is read from the store so a reconnecting client rejoins
/// every room without any room state having been persisted.
pub async fn handle_announce(state: &AppState, conn: &ConnectionHandle, user_id: String) {
    if user_id.is_empty() {
        return;
    }

    state.presence.announce(&user_id, conn.clone());

    let db = state.db.clone();
    let uid = user_id.clone();
    let group_ids = tokio::task::spawn_blocking(move || {
        let conn = db.lock().ok()?;
        queries::ensure_user(&conn, &uid).ok()?;
        queries::group_ids_for_user(&conn, &uid).ok()
    })
    .await
    .ok()
    .flatten()
    .unwrap_or_default();

    state.rooms.join_all(conn, &group_ids);

    tracing::info!(
        conn_id = conn.id,
        user_id = %user_id,
        rooms = group_ids.len(),
        "User announced"
    );

    status::broadcast_online_users(state).await;
}
