//! The persistence collaborator's contract surface, as consumed by the hub:
//! status transitions keyed by message id, bulk read marking, reaction
//! upserts, the durable online preference, and the group/conversation
//! lookups that drive room joins and pair inference.
//!
//! All functions are synchronous and take a raw connection; async callers
//! go through `tokio::task::spawn_blocking` with the shared `DbPool`.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::store::models::{MessageStatus, OnlineStatus, Reaction};

/// Insert the user row if it does not exist yet (default preference:
/// online). Called at announce time so the hub works even before the HTTP
/// layer has written anything.
pub fn ensure_user(conn: &Connection, user_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id) VALUES (?1)",
        params![user_id],
    )?;
    Ok(())
}

/// Write the durable online/offline preference (upsert).
pub fn set_user_status(
    conn: &Connection,
    user_id: &str,
    status: OnlineStatus,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, status) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET status = excluded.status",
        params![user_id, status.as_str()],
    )?;
    Ok(())
}

/// Read the durable preference back, if the user exists.
pub fn user_status(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<OnlineStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(status.as_deref().and_then(OnlineStatus::from_str))
}

/// Filter a presence snapshot down to the users whose durable preference is
/// "online". Returns ids sorted for stable broadcasts.
pub fn online_user_ids(conn: &Connection, candidates: &[String]) -> rusqlite::Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; candidates.len()].join(",");
    let sql = format!(
        "SELECT id FROM users WHERE status = 'online' AND id IN ({placeholders}) ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(candidates.iter()), |row| row.get(0))?;
    rows.collect()
}

/// Group conversation ids the user belongs to — the announce-time room
/// join list.
pub fn group_ids_for_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.id FROM conversations c
         JOIN participants p ON p.conversation_id = c.id
         WHERE c.is_group = 1 AND p.user_id = ?1",
    )?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
    rows.collect()
}

/// The 1:1 conversation shared by a pair of users, if any. Used when a
/// mark-read request names the counterpart instead of the conversation.
pub fn direct_conversation_id(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT c.id FROM conversations c
         WHERE c.is_group = 0
           AND EXISTS (SELECT 1 FROM participants WHERE conversation_id = c.id AND user_id = ?1)
           AND EXISTS (SELECT 1 FROM participants WHERE conversation_id = c.id AND user_id = ?2)
         LIMIT 1",
        params![user_a, user_b],
        |row| row.get(0),
    )
    .optional()
}

/// Create a conversation with its participant rows. Returns the new id.
pub fn create_conversation(
    conn: &Connection,
    is_group: bool,
    name: Option<&str>,
    participant_ids: &[String],
) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO conversations (id, is_group, name) VALUES (?1, ?2, ?3)",
        params![id, is_group, name],
    )?;
    for user_id in participant_ids {
        conn.execute(
            "INSERT OR IGNORE INTO participants (conversation_id, user_id) VALUES (?1, ?2)",
            params![id, user_id],
        )?;
    }
    Ok(id)
}

/// Append a message in SENT state. Returns the new id.
pub fn create_message(
    conn: &Connection,
    conversation_id: &str,
    sender_id: &str,
    body: Option<&str>,
    attachment: Option<&str>,
) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, body, attachment, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'SENT', ?6)",
        params![
            id,
            conversation_id,
            sender_id,
            body,
            attachment,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(id)
}

/// Current status of one message.
pub fn message_status(
    conn: &Connection,
    message_id: &str,
) -> rusqlite::Result<Option<MessageStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM messages WHERE id = ?1",
            params![message_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(status.as_deref().and_then(MessageStatus::from_str))
}

/// Advance one message from SENT to DELIVERED, keyed strictly by id.
/// The status guard makes the transition monotonic: a DELIVERED or READ row
/// is never touched. Returns whether a row changed.
pub fn mark_delivered(conn: &Connection, message_id: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE messages SET status = 'DELIVERED' WHERE id = ?1 AND status = 'SENT'",
        params![message_id],
    )?;
    Ok(changed > 0)
}

/// Advance every message in the conversation authored by someone other than
/// the reader, and not already READ, to READ. Returns the number of rows
/// transitioned.
pub fn mark_read(conn: &Connection, conversation_id: &str, reader_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE messages SET status = 'READ'
         WHERE conversation_id = ?1 AND sender_id != ?2 AND status != 'READ'",
        params![conversation_id, reader_id],
    )
}

/// Upsert a reaction keyed by (message, user): a second add from the same
/// user replaces the emoji rather than duplicating.
pub fn upsert_reaction(
    conn: &Connection,
    message_id: &str,
    user_id: &str,
    emoji: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reactions (message_id, user_id, emoji) VALUES (?1, ?2, ?3)
         ON CONFLICT(message_id, user_id) DO UPDATE SET emoji = excluded.emoji",
        params![message_id, user_id, emoji],
    )?;
    Ok(())
}

/// Delete the (message, user) reaction row. Returns whether one existed.
pub fn remove_reaction(
    conn: &Connection,
    message_id: &str,
    user_id: &str,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2",
        params![message_id, user_id],
    )?;
    Ok(changed > 0)
}

/// Current reaction set for a message.
pub fn reactions_for_message(
    conn: &Connection,
    message_id: &str,
) -> rusqlite::Result<Vec<Reaction>> {
    let mut stmt = conn.prepare(
        "SELECT message_id, user_id, emoji, created_at
         FROM reactions WHERE message_id = ?1 ORDER BY user_id",
    )?;
    let rows = stmt.query_map(params![message_id], |row| {
        Ok(Reaction {
            message_id: row.get(0)?,
            user_id: row.get(1)?,
            emoji: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    rows.collect()
}
