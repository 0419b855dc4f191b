//! Relation and membership database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for chatroom_relations table
#[derive(Debug, Clone, FromRow)]
pub struct RelationModel {
    pub username: String,
    pub chatroom_name: String,
    pub kind: String,
}

/// Database model for memberships table
#[derive(Debug, Clone, FromRow)]
pub struct MembershipModel {
    pub username: String,
    pub chatroom_name: String,
    pub last_read: DateTime<Utc>,
    pub when_joined: DateTime<Utc>,
}
