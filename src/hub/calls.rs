//! Call signaling relay for 1:1 and N-party mesh calls.
//!
//! One primitive shared by both protocols: resolve the target user in the
//! presence registry and push the payload if reachable. The hub keeps no
//! call session object and enforces no timeout — an unanswered offer stays
//! ringing until an explicit answer/reject/end, and the 1:1 call state
//! machine (IDLE -> RINGING -> ACCEPTED/REJECTED -> CONNECTED -> ENDED)
//! lives entirely in the two clients.
//!
//! Mesh group calls: a join is broadcast to the room, then every existing
//! member negotiates a pairwise link with the joiner through addressed
//! offer/answer relays. That is O(n) relays per join and O(n^2) signaling
//! messages total for an n-party call — acceptable for small groups, a
//! known scalability ceiling for large ones (no selective-forwarding unit).

use crate::hub::presence::PresenceRegistry;
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionHandle;

/// Relay primitive: presence resolve + conditional push. A target with no
/// registry entry is silently dropped; the caller-side client owns its own
/// "no answer" policy.
pub fn relay_to(presence: &PresenceRegistry, to_user: &str, event: &ServerEvent) -> bool {
    match presence.resolve(to_user) {
        Some(handle) => {
            handle.send(event);
            true
        }
        None => {
            tracing::debug!(target_user = %to_user, "Relay target unreachable, dropping");
            false
        }
    }
}

/// Caller -> callee: relay the offer; the callee enters RINGING.
pub fn handle_call_offer(
    state: &AppState,
    to: String,
    from: String,
    caller_name: Option<String>,
    call_type: String,
    payload: serde_json::Value,
) {
    relay_to(
        &state.presence,
        &to,
        &ServerEvent::CallOffer {
            from,
            caller_name,
            call_type,
            payload,
        },
    );
}

/// Callee -> caller: relay the answer; the caller observes ACCEPTED.
pub fn handle_call_answer(state: &AppState, to: String, from: String, payload: serde_json::Value) {
    relay_to(&state.presence, &to, &ServerEvent::CallAnswer { from, payload });
}

/// Callee -> caller: explicit reject.
pub fn handle_call_reject(state: &AppState, to: String, from: String) {
    relay_to(&state.presence, &to, &ServerEvent::CallRejected { from });
}

/// Either side, any point after ACCEPTED: both observe ENDED.
pub fn handle_call_end(state: &AppState, to: String, from: String) {
    relay_to(&state.presence, &to, &ServerEvent::CallEnded { from });
}

/// ICE candidate relay, both directions.
pub fn handle_ice_candidate(
    state: &AppState,
    to: String,
    from: String,
    payload: serde_json::Value,
) {
    relay_to(&state.presence, &to, &ServerEvent::IceCandidate { from, payload });
}

/// A participant joins a group call: broadcast `peer-joined` to the room,
/// excluding the joiner. Each existing member then initiates its own
/// pairwise offer addressed to the joiner.
pub fn handle_join_call(
    state: &AppState,
    conn: &ConnectionHandle,
    group_id: String,
    from: String,
    display_name: Option<String>,
) {
    let event = ServerEvent::PeerJoined {
        group_id: group_id.clone(),
        from,
        display_name,
    };
    state.rooms.broadcast(&group_id, &event, conn.id);
}

/// Pairwise mesh offer, existing member -> joiner.
pub fn handle_peer_offer(
    state: &AppState,
    to: String,
    from: String,
    display_name: Option<String>,
    payload: serde_json::Value,
) {
    relay_to(
        &state.presence,
        &to,
        &ServerEvent::PeerOffer {
            from,
            display_name,
            payload,
        },
    );
}

/// Pairwise mesh answer, joiner -> existing member.
pub fn handle_peer_answer(state: &AppState, to: String, from: String, payload: serde_json::Value) {
    relay_to(&state.presence, &to, &ServerEvent::PeerAnswer { from, payload });
}
