//! Status broadcaster: recomputes and republishes the global online-user
//! list whenever presence or the durable preference changes.
//!
//! A user appears in the list iff it holds a live connection AND its durable
//! preference is "online". The list is pushed to every connected client as a
//! full broadcast, not a diff — list sizes are small and this keeps clients
//! trivially convergent.

use crate::state::AppState;
use crate::store::models::OnlineStatus;
use crate::store::queries;
use crate::ws;
use crate::ws::protocol::ServerEvent;

/// Recompute the online list and push it to every live connection.
pub async fn broadcast_online_users(state: &AppState) {
    let candidates = state.presence.user_ids();

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<String>, String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        queries::online_user_ids(&conn, &candidates).map_err(|e| e.to_string())
    })
    .await;

    let users = match result {
        Ok(Ok(users)) => users,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Online-list query failed, skipping broadcast");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Online-list task failed, skipping broadcast");
            return;
        }
    };

    ws::broadcast_to_all(&state.connections, &ServerEvent::OnlineUsers { users });
}

/// Handle `set-status`: persist the durable online/offline preference, then
/// rebroadcast. The preference survives disconnects; presence does not.
pub async fn handle_set_status(state: &AppState, user_id: String, status: String) {
    let status = match OnlineStatus::from_str(&status) {
        Some(status) => status,
        None => {
            tracing::warn!(user_id = %user_id, status = %status, "Unknown status value, ignoring");
            return;
        }
    };

    let db = state.db.clone();
    let uid = user_id.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
        let conn = db.lock().map_err(|_| "store lock poisoned".to_string())?;
        queries::set_user_status(&conn, &uid, status).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {
            broadcast_online_users(state).await;
        }
        Ok(Err(e)) => {
            tracing::warn!(user_id = %user_id, error = %e, "Status preference write failed");
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Status preference task failed");
        }
    }
}
