/// Database row types and enums for the hub's persistence surface.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// Message lifecycle status. Transitions are a non-decreasing walk
/// SENT -> DELIVERED -> READ; READ is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SENT" => Some(Self::Sent),
            "DELIVERED" => Some(Self::Delivered),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Read => "READ",
        }
    }
}

/// Durable online/offline preference, owned by the store. Distinct from
/// presence: a user is reported online only when both hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineStatus {
    Online,
    Offline,
}

impl OnlineStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Conversation record: 1:1 pair or group
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub is_group: bool,
    pub name: Option<String>,
    pub created_at: String,
}

/// Persisted message row. The hub mutates only `status`.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: Option<String>,
    pub attachment: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Emoji reaction on a message — at most one per (message, user)
#[derive(Debug, Clone)]
pub struct Reaction {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}
