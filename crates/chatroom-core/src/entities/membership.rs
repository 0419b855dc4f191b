//! Membership entity - a user's join record for one chatroom

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value_objects::{ChatroomName, Username};

/// Join record for a (user, chatroom) pair
///
/// Exists exactly while the user is a member of the chatroom. Leaving and
/// rejoining produces a new record with a new `when_joined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub username: Username,
    pub chatroom_name: ChatroomName,
    /// Last time the user read the chatroom
    pub last_read: DateTime<Utc>,
    pub when_joined: DateTime<Utc>,
}

impl Membership {
    /// Create a membership that starts at `now`
    pub fn new(username: Username, chatroom_name: ChatroomName, now: DateTime<Utc>) -> Self {
        Self {
            username,
            chatroom_name,
            last_read: now,
            when_joined: now,
        }
    }

    /// Record that the user read the chatroom at `at`
    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        self.last_read = at;
    }

    /// Check if this record belongs to the given pair
    #[inline]
    pub fn is_for(&self, username: &Username, chatroom_name: &ChatroomName) -> bool {
        &self.username == username && &self.chatroom_name == chatroom_name
    }
}

/// Highest standing a user has in a chatroom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatroomUserRelation {
    Owner,
    Admin,
    Member,
    NotMember,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pair() -> (Username, ChatroomName) {
        (
            Username::parse("alice").unwrap(),
            ChatroomName::parse("lobby").unwrap(),
        )
    }

    #[test]
    fn test_membership_creation() {
        let (user, room) = pair();
        let now = Utc::now();
        let membership = Membership::new(user.clone(), room.clone(), now);

        assert_eq!(membership.when_joined, now);
        assert_eq!(membership.last_read, now);
        assert!(membership.is_for(&user, &room));
    }

    #[test]
    fn test_mark_read_keeps_join_time() {
        let (user, room) = pair();
        let joined = Utc::now();
        let mut membership = Membership::new(user, room, joined);

        let later = joined + Duration::minutes(5);
        membership.mark_read(later);

        assert_eq!(membership.last_read, later);
        assert_eq!(membership.when_joined, joined);
    }

    #[test]
    fn test_relation_serializes_upper_case() {
        let json = serde_json::to_string(&ChatroomUserRelation::NotMember).unwrap();
        assert_eq!(json, "\"NOT_MEMBER\"");
    }
}
