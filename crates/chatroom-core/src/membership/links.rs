//! Symmetric edits of user/chatroom relation sets
//!
//! Every relation is recorded on both aggregates. These helpers are the only
//! place that touches the sets, so a relation is either present on both sides
//! or on neither.

use chrono::{DateTime, Utc};

use crate::entities::{Chatroom, Membership, User};
use crate::value_objects::{RelationKind, Relations};

/// Check if the relation is present on the user side
fn user_side(user: &User, chatroom: &Chatroom, kind: RelationKind) -> bool {
    user.chatrooms(kind).contains(&chatroom.name)
}

/// Check if the relation is present on the chatroom side
fn chatroom_side(user: &User, chatroom: &Chatroom, kind: RelationKind) -> bool {
    match chatroom.users(kind) {
        Some(users) => users.contains(&user.username),
        None => chatroom.is_owned_by(&user.username),
    }
}

/// Check if both aggregates record the relation
pub fn is_linked(user: &User, chatroom: &Chatroom, kind: RelationKind) -> bool {
    user_side(user, chatroom, kind) && chatroom_side(user, chatroom, kind)
}

/// Record a relation on both aggregates
///
/// Linking `Member` also creates the pair's [`Membership`] starting at `now`.
/// `Owner` can only be linked for the chatroom's recorded owner; for anyone
/// else it is a no-op. Returns `true` if anything changed.
pub fn link(user: &mut User, chatroom: &mut Chatroom, kind: RelationKind, now: DateTime<Utc>) -> bool {
    if kind == RelationKind::Owner && !chatroom.is_owned_by(&user.username) {
        return false;
    }

    let mut changed = user.chatrooms_mut(kind).insert(chatroom.name.clone());
    if let Some(users) = chatroom.users_mut(kind) {
        changed |= users.insert(user.username.clone());
    }
    if kind == RelationKind::Member {
        changed |= user.add_membership(Membership::new(
            user.username.clone(),
            chatroom.name.clone(),
            now,
        ));
    }
    changed
}

/// Remove a relation from both aggregates
///
/// Unlinking `Member` drops the pair's [`Membership`]. Unlinking `Owner`
/// only clears the user side; the chatroom's owner field is immutable.
/// Returns `true` if anything changed.
pub fn unlink(user: &mut User, chatroom: &mut Chatroom, kind: RelationKind) -> bool {
    let mut changed = user.chatrooms_mut(kind).remove(&chatroom.name);
    if let Some(users) = chatroom.users_mut(kind) {
        changed |= users.remove(&user.username);
    }
    if kind == RelationKind::Member {
        changed |= user.remove_membership(&chatroom.name).is_some();
    }
    changed
}

/// Full relation state of the pair, counting only relations present on both sides
pub fn relations_between(user: &User, chatroom: &Chatroom) -> Relations {
    Relations::from_kinds(
        RelationKind::ALL
            .into_iter()
            .filter(|&kind| is_linked(user, chatroom, kind)),
    )
}

/// Check that the two aggregates agree on every relation of the pair and that
/// the Membership record matches the member relation
pub fn is_consistent(user: &User, chatroom: &Chatroom) -> bool {
    let sides_agree = RelationKind::ALL
        .into_iter()
        .all(|kind| user_side(user, chatroom, kind) == chatroom_side(user, chatroom, kind));

    let membership_count = user
        .memberships
        .iter()
        .filter(|m| m.chatroom_name == chatroom.name)
        .count();
    let expected_memberships = usize::from(is_linked(user, chatroom, RelationKind::Member));

    sides_agree && membership_count == expected_memberships
}
