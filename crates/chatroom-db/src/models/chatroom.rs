//! Chatroom database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for chatrooms table
#[derive(Debug, Clone, FromRow)]
pub struct ChatroomModel {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub listed: bool,
    pub invite_only: bool,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub last_message_received: DateTime<Utc>,
}
