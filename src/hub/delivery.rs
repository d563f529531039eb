//! Delivery state machine and reaction relays.
//!
//! Message lifecycle: SENT -> DELIVERED -> READ, monotonic, READ terminal.
//! The transitions themselves are guarded in SQL (`store::queries`); this
//! module decides *when* a transition fires and pushes the matching
//! acknowledgments.
//!
//! All pushes here are optimistic: the live event goes out before the
//! durable write, and a failed write is logged and never rolled back on the
//! client side. A client can therefore observe DELIVERED live while the
//! durable row still says SENT.

use crate::hub::router;
use crate::state::AppState;
use crate::store::queries;
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionHandle;

/// Handle `send-message`.
///
/// Group path: room broadcast, no delivery state tracking (groups do not
/// carry DELIVERED/READ). 1:1 path: if the recipient is reachable, push the
/// message, acknowledge delivery to the sender, and advance the message row
/// from SENT to DELIVERED — keyed strictly by message id, so a concurrent
/// in-flight send can never be marked delivered by association.
#[allow(clippy::too_many_arguments)]
pub async fn handle_send_message(
    state: &AppState,
    conn: &ConnectionHandle,
    message_id: String,
    to: String,
    from: String,
    body: Option<String>,
    is_group: bool,
    attachment: Option<String>,
    sender_name: Option<String>,
) {
    if is_group {
        let event = ServerEvent::MessageReceived {
            message_id,
            from,
            conversation_id: Some(to.clone()),
            is_group: true,
            body,
            attachment,
            sender_name,
        };
        state.rooms.broadcast(&to, &event, conn.id);
        return;
    }

    let recipient = match state.presence.resolve(&to) {
        Some(handle) => handle,
        None => {
            // At-most-once live delivery: the recipient polls the message
            // from the store later, still SENT.
            tracing::debug!(target_user = %to, message_id = %message_id, "Recipient offline, no push");
            return;
        }
    };

    recipient.send(&ServerEvent::MessageReceived {
        message_id: message_id.clone(),
        from,
        conversation_id: None,
        is_group: false,
        body,
        attachment,
        sender_name,
    });
    conn.send(&ServerEvent::DeliveryAck { from: to.clone() });

    let db = state.db.clone();
    let mid = message_id.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<bool, String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        queries::mark_delivered(&conn, &mid).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            tracing::debug!(message_id = %message_id, "Message already past SENT, no transition");
        }
        Ok(Err(e)) => {
            tracing::warn!(message_id = %message_id, error = %e, "DELIVERED transition failed");
        }
        Err(e) => {
            tracing::warn!(message_id = %message_id, error = %e, "DELIVERED transition task failed");
        }
    }
}

/// Handle `mark-read`.
///
/// Transitions every message in the conversation authored by someone other
/// than the requester (and not already READ) to READ, then pushes a single
/// conversation-scoped read receipt to the counterpart's connection. The
/// conversation may be named directly or inferred from the pair.
pub async fn handle_mark_read(
    state: &AppState,
    conversation_id: Option<String>,
    requester_id: String,
    counterpart_id: String,
) {
    if let Some(handle) = state.presence.resolve(&counterpart_id) {
        handle.send(&ServerEvent::ReadAck {
            from: requester_id.clone(),
        });
    }

    let db = state.db.clone();
    let requester = requester_id.clone();
    let counterpart = counterpart_id.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<usize, String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        let conversation = match conversation_id {
            Some(id) => id,
            None => queries::direct_conversation_id(&conn, &requester, &counterpart)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| "no direct conversation for pair".to_string())?,
        };
        queries::mark_read(&conn, &conversation, &requester).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(updated)) => {
            tracing::debug!(
                requester = %requester_id,
                counterpart = %counterpart_id,
                updated,
                "READ transition applied"
            );
        }
        Ok(Err(e)) => {
            tracing::warn!(requester = %requester_id, error = %e, "READ transition failed");
        }
        Err(e) => {
            tracing::warn!(requester = %requester_id, error = %e, "READ transition task failed");
        }
    }
}

/// Handle `add-reaction`: upsert keyed by (message, user) — a second add
/// from the same user replaces the emoji rather than duplicating — and
/// relay the change to the counterpart so both clients converge without
/// polling.
pub async fn handle_add_reaction(
    state: &AppState,
    message_id: String,
    to: String,
    from: String,
    emoji: String,
) {
    router::route(
        state,
        &to,
        false,
        0,
        &ServerEvent::ReactionAdded {
            message_id: message_id.clone(),
            from: from.clone(),
            emoji: emoji.clone(),
        },
    );

    let db = state.db.clone();
    let mid = message_id.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        queries::upsert_reaction(&conn, &mid, &from, &emoji).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(message_id = %message_id, error = %e, "Reaction upsert failed");
        }
        Err(e) => {
            tracing::warn!(message_id = %message_id, error = %e, "Reaction upsert task failed");
        }
    }
}

/// Handle `remove-reaction`: delete the (message, user) row and relay.
pub async fn handle_remove_reaction(
    state: &AppState,
    message_id: String,
    to: String,
    from: String,
) {
    router::route(
        state,
        &to,
        false,
        0,
        &ServerEvent::ReactionRemoved {
            message_id: message_id.clone(),
            from: from.clone(),
        },
    );

    let db = state.db.clone();
    let mid = message_id.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<bool, String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        queries::remove_reaction(&conn, &mid, &from).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::warn!(message_id = %message_id, error = %e, "Reaction removal failed");
        }
        Err(e) => {
            tracing::warn!(message_id = %message_id, error = %e, "Reaction removal task failed");
        }
    }
}
