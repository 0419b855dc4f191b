//! User database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}
