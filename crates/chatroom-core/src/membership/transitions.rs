//! Membership state transitions
//!
//! Each public transition validates its preconditions before touching either
//! aggregate, so a rejected transition leaves both unchanged. Cascades are
//! built from the small grant/revoke/extend/retract steps below.

use chrono::{DateTime, Utc};

use crate::entities::{Chatroom, User};
use crate::error::DomainError;
use crate::value_objects::RelationKind;

use super::links::{link, unlink};
use super::predicates::{
    admin_invitation_sent, can_become_admin, can_join, is_admin, is_member, is_owner,
    member_invitation_sent,
};

// =============================================================================
// Building blocks
// =============================================================================

fn extend_member_invite(user: &mut User, chatroom: &mut Chatroom, now: DateTime<Utc>) {
    link(user, chatroom, RelationKind::MemberInvite, now);
}

fn retract_member_invite(user: &mut User, chatroom: &mut Chatroom) {
    unlink(user, chatroom, RelationKind::MemberInvite);
}

fn extend_admin_invite(user: &mut User, chatroom: &mut Chatroom, now: DateTime<Utc>) {
    link(user, chatroom, RelationKind::AdminInvite, now);
}

fn retract_admin_invite(user: &mut User, chatroom: &mut Chatroom) {
    unlink(user, chatroom, RelationKind::AdminInvite);
}

fn grant_membership(user: &mut User, chatroom: &mut Chatroom, now: DateTime<Utc>) {
    link(user, chatroom, RelationKind::Member, now);
}

/// Admin status requires membership, so granting it grants membership too
fn grant_admin(user: &mut User, chatroom: &mut Chatroom, now: DateTime<Utc>) {
    grant_membership(user, chatroom, now);
    link(user, chatroom, RelationKind::Admin, now);
}

fn revoke_admin(user: &mut User, chatroom: &mut Chatroom) {
    unlink(user, chatroom, RelationKind::Admin);
}

/// A user who stops being a member also stops being an administrator
fn revoke_membership(user: &mut User, chatroom: &mut Chatroom) {
    revoke_admin(user, chatroom);
    unlink(user, chatroom, RelationKind::Member);
}

// =============================================================================
// Transitions
// =============================================================================

/// Link a freshly created chatroom to its owner as owner, administrator and member
pub fn establish_owner(
    owner: &mut User,
    chatroom: &mut Chatroom,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if !chatroom.is_owned_by(&owner.username) {
        return Err(DomainError::NotChatroomOwner);
    }
    link(owner, chatroom, RelationKind::Owner, now);
    grant_admin(owner, chatroom, now);
    Ok(())
}

/// Invite a user to become a member
pub fn send_member_invitation(
    invitee: &mut User,
    chatroom: &mut Chatroom,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if is_member(invitee, chatroom) {
        return Err(DomainError::AlreadyMember);
    }
    if member_invitation_sent(invitee, chatroom) {
        return Err(DomainError::InvitePending);
    }
    extend_member_invite(invitee, chatroom, now);
    Ok(())
}

/// Invite a user to become an administrator
///
/// A non-member also receives a member invitation unless one is already
/// pending, in which case the existing one is kept.
pub fn send_admin_invitation(
    invitee: &mut User,
    chatroom: &mut Chatroom,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if admin_invitation_sent(invitee, chatroom) {
        return Err(DomainError::AdminInvitePending);
    }
    if is_admin(invitee, chatroom) {
        return Err(DomainError::AlreadyAdmin);
    }
    if !is_member(invitee, chatroom) && !member_invitation_sent(invitee, chatroom) {
        extend_member_invite(invitee, chatroom, now);
    }
    extend_admin_invite(invitee, chatroom, now);
    Ok(())
}

/// Join a chatroom, consuming any pending member invitation
pub fn join_chatroom(
    user: &mut User,
    chatroom: &mut Chatroom,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if is_member(user, chatroom) {
        return Err(DomainError::AlreadyMember);
    }
    if !can_join(user, chatroom) {
        return Err(DomainError::UnauthorizedJoin);
    }
    retract_member_invite(user, chatroom);
    grant_membership(user, chatroom, now);
    Ok(())
}

/// Accept a pending admin invitation, joining the chatroom if necessary
pub fn accept_admin_invite(
    user: &mut User,
    chatroom: &mut Chatroom,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if is_admin(user, chatroom) {
        return Err(DomainError::AlreadyAdmin);
    }
    if !can_become_admin(user, chatroom) {
        return Err(DomainError::UnauthorizedAdminAccept);
    }
    retract_member_invite(user, chatroom);
    retract_admin_invite(user, chatroom);
    grant_admin(user, chatroom, now);
    Ok(())
}

/// Decline a member invitation; a pending admin invitation goes with it
pub fn reject_chatroom_invitation(
    user: &mut User,
    chatroom: &mut Chatroom,
) -> Result<(), DomainError> {
    if !member_invitation_sent(user, chatroom) {
        return Err(DomainError::NoInvite);
    }
    retract_member_invite(user, chatroom);
    retract_admin_invite(user, chatroom);
    Ok(())
}

/// Decline only the admin invitation
pub fn reject_admin_invitation(
    user: &mut User,
    chatroom: &mut Chatroom,
) -> Result<(), DomainError> {
    if !admin_invitation_sent(user, chatroom) {
        return Err(DomainError::NoInvite);
    }
    retract_admin_invite(user, chatroom);
    Ok(())
}

/// Leave a chatroom, dropping admin status as well
pub fn leave_chatroom(user: &mut User, chatroom: &mut Chatroom) -> Result<(), DomainError> {
    if is_owner(user, chatroom) {
        return Err(DomainError::OwnerCannotLeave);
    }
    if !is_member(user, chatroom) {
        return Err(DomainError::NotMember);
    }
    revoke_membership(user, chatroom);
    Ok(())
}

/// Step down as administrator while staying a member
pub fn quit_admin(user: &mut User, chatroom: &mut Chatroom) -> Result<(), DomainError> {
    if is_owner(user, chatroom) {
        return Err(DomainError::OwnerCannotLeave);
    }
    if !is_admin(user, chatroom) {
        return Err(DomainError::NotAdmin);
    }
    revoke_admin(user, chatroom);
    Ok(())
}
