//! Room membership index: group conversation id -> currently-joined
//! connections, used for group fan-out.
//!
//! Membership is a derived view over live connections and the durable group
//! participant lists; nothing here is persisted. A connection joins its
//! rooms at announce time and joins new rooms live on `create-group`.

use dashmap::DashMap;

use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionHandle;

#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: DashMap<String, Vec<ConnectionHandle>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Join a connection to one room. Idempotent by connection id.
    pub fn join(&self, group_id: &str, handle: &ConnectionHandle) {
        let mut members = self.rooms.entry(group_id.to_string()).or_default();
        if !members.iter().any(|m| m.id == handle.id) {
            members.push(handle.clone());
        }
    }

    /// Announce-time bulk join: one call with every group the user belongs to.
    pub fn join_all(&self, handle: &ConnectionHandle, group_ids: &[String]) {
        for group_id in group_ids {
            self.join(group_id, handle);
        }
    }

    /// Deliver an event to every connection joined to the room except the
    /// sender's own (the sender already has a local echo). Serializes once;
    /// closed senders are pruned on the way through.
    pub fn broadcast(&self, group_id: &str, event: &ServerEvent, exclude_conn: u64) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(_) => return,
        };

        if let Some(mut members) = self.rooms.get_mut(group_id) {
            members.retain(|m| !m.is_closed());
            for member in members.iter() {
                if member.id != exclude_conn {
                    member.send_text(&text);
                }
            }
        }
    }

    /// Transport-close cleanup: drop the connection from every room it
    /// joined. Empty rooms are removed.
    pub fn leave_all(&self, conn_id: u64) {
        let group_ids: Vec<String> = self.rooms.iter().map(|e| e.key().clone()).collect();

        for group_id in group_ids {
            if let Some(mut members) = self.rooms.get_mut(&group_id) {
                members.retain(|m| m.id != conn_id);
                if members.is_empty() {
                    drop(members);
                    self.rooms.remove(&group_id);
                }
            }
        }
    }

    /// Connection ids currently joined to a room.
    pub fn member_ids(&self, group_id: &str) -> Vec<u64> {
        self.rooms
            .get(group_id)
            .map(|members| members.iter().map(|m| m.id).collect())
            .unwrap_or_default()
    }
}

/// Handle `create-group`: join every currently-connected participant to the
/// new room and notify them, so live connections start receiving the room's
/// fan-out without reconnecting. Offline participants pick the group up from
/// the store on their next announce.
pub fn handle_create_group(state: &AppState, group_id: String, participant_ids: Vec<String>) {
    let event = ServerEvent::GroupCreated {
        group_id: group_id.clone(),
        participant_ids: participant_ids.clone(),
    };

    for participant_id in &participant_ids {
        if let Some(handle) = state.presence.resolve(participant_id) {
            state.rooms.join(&group_id, &handle);
            handle.send(&event);
        }
    }

    tracing::debug!(
        group_id = %group_id,
        participants = participant_ids.len(),
        "Group room created"
    );
}
