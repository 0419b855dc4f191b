//! Read-only questions about a user's standing in a chatroom

use crate::entities::{Chatroom, ChatroomUserRelation, Membership, User};
use crate::error::DomainError;
use crate::value_objects::RelationKind;

use super::links::is_linked;

#[inline]
pub fn is_member(user: &User, chatroom: &Chatroom) -> bool {
    is_linked(user, chatroom, RelationKind::Member)
}

#[inline]
pub fn is_admin(user: &User, chatroom: &Chatroom) -> bool {
    is_linked(user, chatroom, RelationKind::Admin)
}

#[inline]
pub fn is_owner(user: &User, chatroom: &Chatroom) -> bool {
    is_linked(user, chatroom, RelationKind::Owner)
}

/// Check if the chatroom has a pending member invitation for the user
#[inline]
pub fn member_invitation_sent(user: &User, chatroom: &Chatroom) -> bool {
    is_linked(user, chatroom, RelationKind::MemberInvite)
}

/// Check if the chatroom has a pending admin invitation for the user
#[inline]
pub fn admin_invitation_sent(user: &User, chatroom: &Chatroom) -> bool {
    is_linked(user, chatroom, RelationKind::AdminInvite)
}

/// Open chatrooms can be joined by anyone; invite-only ones need a pending invite
pub fn can_join(user: &User, chatroom: &Chatroom) -> bool {
    !chatroom.invite_only || member_invitation_sent(user, chatroom)
}

pub fn can_become_admin(user: &User, chatroom: &Chatroom) -> bool {
    admin_invitation_sent(user, chatroom)
}

/// Owners and administrators may invite members
pub fn has_member_invite_privileges(user: &User, chatroom: &Chatroom) -> bool {
    is_owner(user, chatroom) || is_admin(user, chatroom)
}

/// Only the owner may invite administrators
pub fn has_admin_invite_privileges(user: &User, chatroom: &Chatroom) -> bool {
    is_owner(user, chatroom)
}

/// Owners and administrators may edit tags
pub fn has_chatroom_tag_privileges(user: &User, chatroom: &Chatroom) -> bool {
    is_owner(user, chatroom) || is_admin(user, chatroom)
}

/// Highest standing of the user in the chatroom
pub fn relation_of(user: &User, chatroom: &Chatroom) -> ChatroomUserRelation {
    if is_owner(user, chatroom) {
        ChatroomUserRelation::Owner
    } else if is_admin(user, chatroom) {
        ChatroomUserRelation::Admin
    } else if is_member(user, chatroom) {
        ChatroomUserRelation::Member
    } else {
        ChatroomUserRelation::NotMember
    }
}

/// Find the user's membership record for the chatroom
pub fn get_user_membership_of_chatroom<'u>(
    user: &'u User,
    chatroom: &Chatroom,
) -> Result<&'u Membership, DomainError> {
    user.membership(&chatroom.name)
        .ok_or(DomainError::MembershipNotFound)
}
