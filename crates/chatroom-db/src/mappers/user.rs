//! User entity <-> model mapper

use std::collections::BTreeSet;

use chatroom_core::entities::{Membership, User};
use chatroom_core::traits::RepoResult;
use chatroom_core::value_objects::Username;

use crate::models::{MembershipModel, UserModel};

use super::{decode_chatroom_name, decode_username};

/// Convert a users row into a User without relations
pub fn user_from_model(model: UserModel) -> RepoResult<User> {
    let mut user = User::new(decode_username(model.username)?, model.display_name);
    user.created_at = model.created_at;
    user.is_active = model.is_active;
    Ok(user)
}

pub fn membership_from_model(model: MembershipModel) -> RepoResult<Membership> {
    Ok(Membership {
        username: decode_username(model.username)?,
        chatroom_name: decode_chatroom_name(model.chatroom_name)?,
        last_read: model.last_read,
        when_joined: model.when_joined,
    })
}

/// Decode a list of usernames into a set
pub(crate) fn username_set(raw: Vec<String>) -> RepoResult<BTreeSet<Username>> {
    raw.into_iter().map(decode_username).collect()
}
