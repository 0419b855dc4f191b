//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use std::collections::BTreeSet;
use std::fmt::Display;

use chatroom_core::entities::{Chatroom, Membership, User};
use chatroom_core::ChatroomUserRelation;

use super::responses::{ChatroomResponse, MembershipResponse, UserRelationsResponse, UserResponse};

fn names<T: Display>(set: &BTreeSet<T>) -> Vec<String> {
    set.iter().map(ToString::to_string).collect()
}

// ============================================================================
// User Mappers
// ============================================================================

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.to_string(),
            display_name: user.display_name.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Standing as recorded on the user's own relation sets
fn standing(user: &User, membership: &Membership) -> ChatroomUserRelation {
    let chatroom = &membership.chatroom_name;
    if user.owned_chatrooms.contains(chatroom) {
        ChatroomUserRelation::Owner
    } else if user.admin_of_chatrooms.contains(chatroom) {
        ChatroomUserRelation::Admin
    } else if user.member_of_chatrooms.contains(chatroom) {
        ChatroomUserRelation::Member
    } else {
        ChatroomUserRelation::NotMember
    }
}

impl From<&User> for UserRelationsResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.to_string(),
            friends: names(&user.friends),
            friend_requestors: names(&user.friend_requestors),
            friend_requestees: names(&user.friend_requestees),
            chatroom_invites: names(&user.chatroom_invites),
            chatroom_admin_invites: names(&user.chatroom_admin_invites),
            chatroom_requests: names(&user.chatroom_requests),
            memberships: user
                .memberships
                .iter()
                .map(|m| MembershipResponse::new(m, standing(user, m)))
                .collect(),
        }
    }
}

// ============================================================================
// Chatroom Mappers
// ============================================================================

impl From<&Chatroom> for ChatroomResponse {
    fn from(chatroom: &Chatroom) -> Self {
        Self {
            name: chatroom.name.to_string(),
            display_name: chatroom.display_name.clone(),
            description: chatroom.description.clone(),
            listed: chatroom.listed,
            invite_only: chatroom.invite_only,
            owner: chatroom.owner.to_string(),
            tags: names(&chatroom.tags),
            member_count: chatroom.members.len(),
            created_at: chatroom.created_at,
            last_message_received: chatroom.last_message_received,
        }
    }
}

impl From<Chatroom> for ChatroomResponse {
    fn from(chatroom: Chatroom) -> Self {
        Self::from(&chatroom)
    }
}

// ============================================================================
// Membership Mappers
// ============================================================================

impl MembershipResponse {
    pub fn new(membership: &Membership, relation: ChatroomUserRelation) -> Self {
        Self {
            username: membership.username.to_string(),
            chatroom_name: membership.chatroom_name.to_string(),
            relation,
            last_read: membership.last_read,
            when_joined: membership.when_joined,
            has_unread: None,
        }
    }

    /// Fill in `has_unread` from the chatroom's last message time
    pub fn with_chatroom(mut self, chatroom: &Chatroom) -> Self {
        self.has_unread = Some(chatroom.last_message_received > self.last_read);
        self
    }
}
