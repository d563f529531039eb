//! Fan-out router: resolves an outbound event to a single peer connection
//! (1:1) or a room broadcast minus the sender (group).
//!
//! An unreachable 1:1 target is the normal store-and-poll-later path, never
//! an error: the event is simply not pushed and the message stays visible
//! through the persistence read path.

use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionHandle;

/// Route an event to a 1:1 user or a group room. Returns whether a live
/// push happened (for 1:1, whether the target was reachable).
pub fn route(
    state: &AppState,
    target: &str,
    is_group: bool,
    exclude_conn: u64,
    event: &ServerEvent,
) -> bool {
    if is_group {
        state.rooms.broadcast(target, event, exclude_conn);
        true
    } else {
        match state.presence.resolve(target) {
            Some(handle) => {
                handle.send(event);
                true
            }
            None => {
                tracing::debug!(target_user = %target, "Target not reachable, no push");
                false
            }
        }
    }
}

/// Handle `unsend-message` (delete-for-everyone): route a removal notice.
/// Carries no state-machine side effect; the receiving client drops the
/// item locally.
pub fn handle_unsend(
    state: &AppState,
    conn: &ConnectionHandle,
    message_id: String,
    to: String,
    from: String,
    is_group: bool,
) {
    let event = ServerEvent::MessageUnsent {
        message_id,
        from,
        is_group,
    };
    route(state, &to, is_group, conn.id, &event);
}

/// Handle `delete-conversation` (delete-for-me): relay the notice to the
/// 1:1 counterpart so its client can refresh the thread list.
pub fn handle_delete_conversation(state: &AppState, to: String, from: String) {
    let event = ServerEvent::ConversationDeleted { from };
    route(state, &to, false, 0, &event);
}
