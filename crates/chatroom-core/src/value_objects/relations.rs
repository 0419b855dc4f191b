//! Relation flags between users and chatrooms, and between two users
//!
//! A user and a chatroom are connected by zero or more relations. The full
//! state of one (user, chatroom) pair fits in a [`Relations`] bitfield, which
//! is what the repositories compare when checking for concurrent edits.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

bitflags! {
    /// Relations held between one user and one chatroom
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Relations: u8 {
        /// User is a member of the chatroom
        const MEMBER        = 1 << 0;
        /// User administers the chatroom
        const ADMIN         = 1 << 1;
        /// User owns the chatroom
        const OWNER         = 1 << 2;
        /// Chatroom invited the user to become a member
        const MEMBER_INVITE = 1 << 3;
        /// Chatroom invited the user to become an administrator
        const ADMIN_INVITE  = 1 << 4;
        /// User asked to join the chatroom
        const JOIN_REQUEST  = 1 << 5;

        /// Relations the membership transitions may create or delete
        const MUTABLE = Self::MEMBER.bits()
            | Self::ADMIN.bits()
            | Self::MEMBER_INVITE.bits()
            | Self::ADMIN_INVITE.bits()
            | Self::JOIN_REQUEST.bits();
    }
}

impl Relations {
    /// Expand the flags into individual relation kinds
    pub fn kinds(self) -> impl Iterator<Item = RelationKind> {
        RelationKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }

    /// Collect relation kinds into a flag set
    pub fn from_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = RelationKind>,
    {
        kinds
            .into_iter()
            .fold(Relations::empty(), |acc, kind| acc | kind.flag())
    }
}

impl fmt::Display for Relations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds().map(RelationKind::as_str).collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// A single relation between a user and a chatroom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    Member,
    Admin,
    Owner,
    MemberInvite,
    AdminInvite,
    JoinRequest,
}

impl RelationKind {
    pub const ALL: [RelationKind; 6] = [
        RelationKind::Member,
        RelationKind::Admin,
        RelationKind::Owner,
        RelationKind::MemberInvite,
        RelationKind::AdminInvite,
        RelationKind::JoinRequest,
    ];

    #[inline]
    pub fn flag(self) -> Relations {
        match self {
            Self::Member => Relations::MEMBER,
            Self::Admin => Relations::ADMIN,
            Self::Owner => Relations::OWNER,
            Self::MemberInvite => Relations::MEMBER_INVITE,
            Self::AdminInvite => Relations::ADMIN_INVITE,
            Self::JoinRequest => Relations::JOIN_REQUEST,
        }
    }

    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::MemberInvite => "member_invite",
            Self::AdminInvite => "admin_invite",
            Self::JoinRequest => "join_request",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::InternalError(format!("unknown relation kind: {s}")))
    }
}

bitflags! {
    /// Friend relations between an ordered pair of users (first, second)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FriendLinks: u8 {
        /// The users are friends
        const FRIENDS          = 1 << 0;
        /// First user sent the second a friend request
        const FIRST_REQUESTED  = 1 << 1;
        /// Second user sent the first a friend request
        const SECOND_REQUESTED = 1 << 2;
    }
}

impl FriendLinks {
    /// The same links seen from the other user's side
    pub fn reversed(self) -> Self {
        let mut reversed = self & FriendLinks::FRIENDS;
        if self.contains(FriendLinks::FIRST_REQUESTED) {
            reversed |= FriendLinks::SECOND_REQUESTED;
        }
        if self.contains(FriendLinks::SECOND_REQUESTED) {
            reversed |= FriendLinks::FIRST_REQUESTED;
        }
        reversed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_storage_name() {
        for kind in RelationKind::ALL {
            assert_eq!(kind.as_str().parse::<RelationKind>().unwrap(), kind);
        }
        assert!("banned".parse::<RelationKind>().is_err());
    }

    #[test]
    fn test_kinds_expansion() {
        let relations = Relations::MEMBER | Relations::ADMIN_INVITE;
        let kinds: Vec<_> = relations.kinds().collect();
        assert_eq!(kinds, vec![RelationKind::Member, RelationKind::AdminInvite]);
        assert_eq!(Relations::from_kinds(kinds), relations);
    }

    #[test]
    fn test_owner_is_not_mutable() {
        assert!(!Relations::MUTABLE.contains(Relations::OWNER));
        assert!(Relations::MUTABLE.contains(Relations::ADMIN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Relations::empty().to_string(), "none");
        assert_eq!(
            (Relations::MEMBER | Relations::ADMIN).to_string(),
            "member|admin"
        );
    }

    #[test]
    fn test_friend_links_reversed() {
        assert_eq!(
            FriendLinks::FIRST_REQUESTED.reversed(),
            FriendLinks::SECOND_REQUESTED
        );
        assert_eq!(FriendLinks::FRIENDS.reversed(), FriendLinks::FRIENDS);
        assert_eq!(FriendLinks::empty().reversed(), FriendLinks::empty());
    }
}
