//! Request DTOs for the chatroom use cases
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! Name syntax is checked again when the strings are parsed into identity types.

use serde::Deserialize;
use validator::Validate;

/// Upper bound on tags attached to one chatroom, matching the `length` checks below
pub const MAX_TAGS_PER_CHATROOM: usize = 20;

// ============================================================================
// User Requests
// ============================================================================

/// Register a user account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,
}

/// Update profile request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: Option<String>,
}

// ============================================================================
// Chatroom Requests
// ============================================================================

fn default_listed() -> bool {
    true
}

/// Create chatroom request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChatroomRequest {
    #[validate(length(min = 1, max = 64, message = "Chatroom name must be 1-64 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: String,

    #[serde(default = "default_listed")]
    pub listed: bool,

    #[serde(default)]
    pub invite_only: bool,

    #[serde(default)]
    #[validate(length(max = 20, message = "Too many tags"))]
    pub tags: Vec<String>,
}

/// Partial chatroom update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateChatroomRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub listed: Option<bool>,

    pub invite_only: Option<bool>,

    /// Replacement tag set
    #[validate(length(max = 20, message = "Too many tags"))]
    pub tags: Option<Vec<String>>,
}
