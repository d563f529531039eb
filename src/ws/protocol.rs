//! Push-channel event catalog and dispatch.
//!
//! Every frame on the wire is a JSON object tagged by `event`. Inbound
//! frames decode into [`ClientEvent`] and are dispatched to the hub
//! components; outbound frames are [`ServerEvent`] values serialized by
//! [`ConnectionHandle::send`](crate::ws::ConnectionHandle::send).

use serde::{Deserialize, Serialize};

use crate::hub::{calls, delivery, presence, rooms, router, status};
use crate::state::AppState;
use crate::ws::ConnectionHandle;

/// Events a client may send over its push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Bind this connection to a user and join its group rooms.
    Announce { user_id: String },
    SendMessage {
        message_id: String,
        to: String,
        from: String,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        is_group: bool,
        #[serde(default)]
        attachment: Option<String>,
        #[serde(default)]
        sender_name: Option<String>,
    },
    /// Delete-for-everyone: tell the recipient(s) to drop the message locally.
    UnsendMessage {
        message_id: String,
        to: String,
        from: String,
        #[serde(default)]
        is_group: bool,
    },
    /// Mark every counterpart-authored message in the conversation as read.
    /// The conversation may be named directly or inferred from the pair.
    MarkRead {
        #[serde(default)]
        conversation_id: Option<String>,
        requester_id: String,
        counterpart_id: String,
    },
    AddReaction {
        message_id: String,
        to: String,
        from: String,
        emoji: String,
    },
    RemoveReaction {
        message_id: String,
        to: String,
        from: String,
    },
    /// Delete-for-me notice relayed to the counterpart.
    DeleteConversation { to: String, from: String },
    /// Join the currently-connected participants to a freshly created group
    /// room and notify them, without waiting for a reconnect.
    CreateGroup {
        group_id: String,
        participant_ids: Vec<String>,
    },
    CallOffer {
        to: String,
        from: String,
        call_type: String,
        payload: serde_json::Value,
        #[serde(default)]
        caller_name: Option<String>,
    },
    CallAnswer {
        to: String,
        from: String,
        payload: serde_json::Value,
    },
    CallReject { to: String, from: String },
    CallEnd { to: String, from: String },
    IceCandidate {
        to: String,
        from: String,
        payload: serde_json::Value,
    },
    /// Announce oneself to a group call; existing members initiate pairwise offers.
    JoinCall {
        group_id: String,
        from: String,
        #[serde(default)]
        display_name: Option<String>,
    },
    PeerOffer {
        to: String,
        from: String,
        #[serde(default)]
        display_name: Option<String>,
        payload: serde_json::Value,
    },
    PeerAnswer {
        to: String,
        from: String,
        payload: serde_json::Value,
    },
    /// Persist the durable online/offline preference and rebroadcast the list.
    SetStatus { user_id: String, status: String },
}

/// Events the hub pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    OnlineUsers { users: Vec<String> },
    MessageReceived {
        message_id: String,
        from: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        is_group: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        attachment: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender_name: Option<String>,
    },
    /// Pushed to the original sender when the recipient was reachable.
    DeliveryAck { from: String },
    /// Conversation-scoped read receipt pushed to the original author.
    ReadAck { from: String },
    MessageUnsent {
        message_id: String,
        from: String,
        is_group: bool,
    },
    ReactionAdded {
        message_id: String,
        from: String,
        emoji: String,
    },
    ReactionRemoved { message_id: String, from: String },
    ConversationDeleted { from: String },
    GroupCreated {
        group_id: String,
        participant_ids: Vec<String>,
    },
    CallOffer {
        from: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caller_name: Option<String>,
        call_type: String,
        payload: serde_json::Value,
    },
    CallAnswer {
        from: String,
        payload: serde_json::Value,
    },
    CallRejected { from: String },
    CallEnded { from: String },
    IceCandidate {
        from: String,
        payload: serde_json::Value,
    },
    PeerJoined {
        group_id: String,
        from: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    PeerOffer {
        from: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        payload: serde_json::Value,
    },
    PeerAnswer {
        from: String,
        payload: serde_json::Value,
    },
    Error { code: u32, message: String },
}

/// Handle one inbound text frame: decode and dispatch.
///
/// Called sequentially from the connection's reader loop, so events from a
/// single client are fully handled in arrival order; handlers for different
/// connections interleave freely.
pub async fn handle_text_frame(text: &str, conn: &ConnectionHandle, state: &AppState) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(conn_id = conn.id, error = %e, "Failed to decode event frame");
            conn.send(&ServerEvent::Error {
                code: 400,
                message: "Invalid event frame".to_string(),
            });
            return;
        }
    };
    dispatch(event, conn, state).await;
}

/// Dispatch a decoded client event to the owning hub component.
async fn dispatch(event: ClientEvent, conn: &ConnectionHandle, state: &AppState) {
    match event {
        ClientEvent::Announce { user_id } => {
            presence::handle_announce(state, conn, user_id).await;
        }
        ClientEvent::SendMessage {
            message_id,
            to,
            from,
            body,
            is_group,
            attachment,
            sender_name,
        } => {
            delivery::handle_send_message(
                state, conn, message_id, to, from, body, is_group, attachment, sender_name,
            )
            .await;
        }
        ClientEvent::UnsendMessage {
            message_id,
            to,
            from,
            is_group,
        } => {
            router::handle_unsend(state, conn, message_id, to, from, is_group);
        }
        ClientEvent::MarkRead {
            conversation_id,
            requester_id,
            counterpart_id,
        } => {
            delivery::handle_mark_read(state, conversation_id, requester_id, counterpart_id).await;
        }
        ClientEvent::AddReaction {
            message_id,
            to,
            from,
            emoji,
        } => {
            delivery::handle_add_reaction(state, message_id, to, from, emoji).await;
        }
        ClientEvent::RemoveReaction {
            message_id,
            to,
            from,
        } => {
            delivery::handle_remove_reaction(state, message_id, to, from).await;
        }
        ClientEvent::DeleteConversation { to, from } => {
            router::handle_delete_conversation(state, to, from);
        }
        ClientEvent::CreateGroup {
            group_id,
            participant_ids,
        } => {
            rooms::handle_create_group(state, group_id, participant_ids);
        }
        ClientEvent::CallOffer {
            to,
            from,
            call_type,
            payload,
            caller_name,
        } => {
            calls::handle_call_offer(state, to, from, caller_name, call_type, payload);
        }
        ClientEvent::CallAnswer { to, from, payload } => {
            calls::handle_call_answer(state, to, from, payload);
        }
        ClientEvent::CallReject { to, from } => {
            calls::handle_call_reject(state, to, from);
        }
        ClientEvent::CallEnd { to, from } => {
            calls::handle_call_end(state, to, from);
        }
        ClientEvent::IceCandidate { to, from, payload } => {
            calls::handle_ice_candidate(state, to, from, payload);
        }
        ClientEvent::JoinCall {
            group_id,
            from,
            display_name,
        } => {
            calls::handle_join_call(state, conn, group_id, from, display_name);
        }
        ClientEvent::PeerOffer {
            to,
            from,
            display_name,
            payload,
        } => {
            calls::handle_peer_offer(state, to, from, display_name, payload);
        }
        ClientEvent::PeerAnswer { to, from, payload } => {
            calls::handle_peer_answer(state, to, from, payload);
        }
        ClientEvent::SetStatus { user_id, status } => {
            status::handle_set_status(state, user_id, status).await;
        }
    }
}
