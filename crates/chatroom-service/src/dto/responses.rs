//! Response DTOs
//!
//! All response DTOs implement `Serialize` for JSON output.

use chatroom_core::ChatroomUserRelation;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public user profile
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Chatroom with its tags and member count
#[derive(Debug, Clone, Serialize)]
pub struct ChatroomResponse {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub listed: bool,
    pub invite_only: bool,
    pub owner: String,
    pub tags: Vec<String>,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_message_received: DateTime<Utc>,
}

/// A user's membership record together with their standing in the chatroom
#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub username: String,
    pub chatroom_name: String,
    pub relation: ChatroomUserRelation,
    pub last_read: DateTime<Utc>,
    pub when_joined: DateTime<Utc>,
    /// Whether messages arrived after `last_read`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_unread: Option<bool>,
}

/// Everything a user is related to
#[derive(Debug, Clone, Serialize)]
pub struct UserRelationsResponse {
    pub username: String,
    pub friends: Vec<String>,
    pub friend_requestors: Vec<String>,
    pub friend_requestees: Vec<String>,
    pub chatroom_invites: Vec<String>,
    pub chatroom_admin_invites: Vec<String>,
    pub chatroom_requests: Vec<String>,
    pub memberships: Vec<MembershipResponse>,
}
