//! Test fixtures and data generators
//!
//! Provides reusable request values for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chatroom_service::dto::{CreateChatroomRequest, CreateUserRequest};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
///
/// Includes the start time so reruns against the same database do not collide.
pub fn unique_suffix() -> String {
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{started}x{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Registration request with a unique username
pub fn user_request(prefix: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: format!("{prefix}{}", unique_suffix()),
        display_name: prefix.to_string(),
    }
}

/// Listed chatroom request with a unique name
pub fn chatroom_request(prefix: &str, invite_only: bool) -> CreateChatroomRequest {
    CreateChatroomRequest {
        name: format!("{prefix}{}", unique_suffix()),
        display_name: prefix.to_string(),
        description: format!("{prefix} test room"),
        listed: true,
        invite_only,
        tags: Vec::new(),
    }
}
