//! Chatroom entity - a named room with an owner and user relation sets

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::value_objects::{ChatroomName, RelationKind, TagName, Username};

/// Chatroom aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chatroom {
    pub name: ChatroomName,
    pub display_name: String,
    pub description: String,
    /// Visible in public listings
    pub listed: bool,
    /// Joining requires a pending member invitation
    pub invite_only: bool,
    pub created_at: DateTime<Utc>,
    pub last_message_received: DateTime<Utc>,
    /// Set at creation and never changed
    pub owner: Username,
    pub tags: BTreeSet<TagName>,

    pub members: BTreeSet<Username>,
    pub administrators: BTreeSet<Username>,
    pub member_invitees: BTreeSet<Username>,
    pub admin_invitees: BTreeSet<Username>,
    pub requestors: BTreeSet<Username>,
}

impl Chatroom {
    /// Create a chatroom owned by `owner`
    ///
    /// The owner's relations are not linked here; see
    /// [`crate::membership::establish_owner`].
    pub fn new(
        name: ChatroomName,
        display_name: impl Into<String>,
        description: impl Into<String>,
        listed: bool,
        invite_only: bool,
        owner: Username,
    ) -> Self {
        let now = Utc::now();
        Self {
            name,
            display_name: display_name.into(),
            description: description.into(),
            listed,
            invite_only,
            created_at: now,
            last_message_received: now,
            owner,
            tags: BTreeSet::new(),
            members: BTreeSet::new(),
            administrators: BTreeSet::new(),
            member_invitees: BTreeSet::new(),
            admin_invitees: BTreeSet::new(),
            requestors: BTreeSet::new(),
        }
    }

    /// Users holding the given relation with this chatroom
    ///
    /// Ownership is a single field rather than a set, so `Owner` yields `None`.
    pub fn users(&self, kind: RelationKind) -> Option<&BTreeSet<Username>> {
        match kind {
            RelationKind::Member => Some(&self.members),
            RelationKind::Admin => Some(&self.administrators),
            RelationKind::MemberInvite => Some(&self.member_invitees),
            RelationKind::AdminInvite => Some(&self.admin_invitees),
            RelationKind::JoinRequest => Some(&self.requestors),
            RelationKind::Owner => None,
        }
    }

    pub(crate) fn users_mut(&mut self, kind: RelationKind) -> Option<&mut BTreeSet<Username>> {
        match kind {
            RelationKind::Member => Some(&mut self.members),
            RelationKind::Admin => Some(&mut self.administrators),
            RelationKind::MemberInvite => Some(&mut self.member_invitees),
            RelationKind::AdminInvite => Some(&mut self.admin_invitees),
            RelationKind::JoinRequest => Some(&mut self.requestors),
            RelationKind::Owner => None,
        }
    }

    #[inline]
    pub fn is_owned_by(&self, username: &Username) -> bool {
        &self.owner == username
    }

    #[inline]
    pub fn has_tag(&self, tag: &TagName) -> bool {
        self.tags.contains(tag)
    }

    /// Record that a message arrived at `at`
    pub fn touch_last_message(&mut self, at: DateTime<Utc>) {
        if at > self.last_message_received {
            self.last_message_received = at;
        }
    }
}
