//! User entity - a chat account and its relation sets

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::entities::Membership;
use crate::value_objects::{ChatroomName, RelationKind, Username};

/// User aggregate
///
/// The chatroom relation sets mirror the matching sets on [`Chatroom`]
/// aggregates; they are edited through [`crate::membership::link`] and
/// [`crate::membership::unlink`] so both sides change together.
///
/// [`Chatroom`]: crate::entities::Chatroom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: Username,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,

    pub friends: BTreeSet<Username>,
    /// Users who sent this user a friend request
    pub friend_requestors: BTreeSet<Username>,
    /// Users this user sent a friend request to
    pub friend_requestees: BTreeSet<Username>,

    pub member_of_chatrooms: BTreeSet<ChatroomName>,
    pub admin_of_chatrooms: BTreeSet<ChatroomName>,
    pub owned_chatrooms: BTreeSet<ChatroomName>,
    /// Received member invitations
    pub chatroom_invites: BTreeSet<ChatroomName>,
    /// Received admin invitations
    pub chatroom_admin_invites: BTreeSet<ChatroomName>,
    /// Sent join requests
    pub chatroom_requests: BTreeSet<ChatroomName>,

    pub memberships: Vec<Membership>,
}

impl User {
    /// Create an active user with no relations
    pub fn new(username: Username, display_name: impl Into<String>) -> Self {
        Self {
            username,
            display_name: display_name.into(),
            created_at: Utc::now(),
            is_active: true,
            friends: BTreeSet::new(),
            friend_requestors: BTreeSet::new(),
            friend_requestees: BTreeSet::new(),
            member_of_chatrooms: BTreeSet::new(),
            admin_of_chatrooms: BTreeSet::new(),
            owned_chatrooms: BTreeSet::new(),
            chatroom_invites: BTreeSet::new(),
            chatroom_admin_invites: BTreeSet::new(),
            chatroom_requests: BTreeSet::new(),
            memberships: Vec::new(),
        }
    }

    /// Chatrooms this user holds the given relation with
    pub fn chatrooms(&self, kind: RelationKind) -> &BTreeSet<ChatroomName> {
        match kind {
            RelationKind::Member => &self.member_of_chatrooms,
            RelationKind::Admin => &self.admin_of_chatrooms,
            RelationKind::Owner => &self.owned_chatrooms,
            RelationKind::MemberInvite => &self.chatroom_invites,
            RelationKind::AdminInvite => &self.chatroom_admin_invites,
            RelationKind::JoinRequest => &self.chatroom_requests,
        }
    }

    pub(crate) fn chatrooms_mut(&mut self, kind: RelationKind) -> &mut BTreeSet<ChatroomName> {
        match kind {
            RelationKind::Member => &mut self.member_of_chatrooms,
            RelationKind::Admin => &mut self.admin_of_chatrooms,
            RelationKind::Owner => &mut self.owned_chatrooms,
            RelationKind::MemberInvite => &mut self.chatroom_invites,
            RelationKind::AdminInvite => &mut self.chatroom_admin_invites,
            RelationKind::JoinRequest => &mut self.chatroom_requests,
        }
    }

    /// Find the membership record for a chatroom
    pub fn membership(&self, chatroom: &ChatroomName) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| &m.chatroom_name == chatroom)
    }

    pub fn membership_mut(&mut self, chatroom: &ChatroomName) -> Option<&mut Membership> {
        self.memberships
            .iter_mut()
            .find(|m| &m.chatroom_name == chatroom)
    }

    /// Add a membership record unless one already exists for the chatroom
    ///
    /// Returns `false` when a record was already present.
    pub(crate) fn add_membership(&mut self, membership: Membership) -> bool {
        if self.membership(&membership.chatroom_name).is_some() {
            return false;
        }
        self.memberships.push(membership);
        true
    }

    pub(crate) fn remove_membership(&mut self, chatroom: &ChatroomName) -> Option<Membership> {
        let pos = self
            .memberships
            .iter()
            .position(|m| &m.chatroom_name == chatroom)?;
        Some(self.memberships.remove(pos))
    }

    /// Check whether the user holds any chatroom relation at all
    pub fn has_chatroom_relations(&self) -> bool {
        RelationKind::ALL
            .into_iter()
            .any(|kind| !self.chatrooms(kind).is_empty())
    }
}
