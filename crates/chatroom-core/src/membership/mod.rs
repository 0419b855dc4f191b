//! Membership rules between users and chatrooms
//!
//! State of one (user, chatroom) pair moves along
//! `not member -> invited -> member -> admin invited -> admin`, with the owner
//! fixed at creation. Predicates and transitions here are pure: they work on
//! in-memory aggregates and leave persistence to the caller.

mod links;
mod predicates;
mod store;
mod transitions;

pub use links::{is_consistent, is_linked, link, relations_between, unlink};
pub use predicates::{
    admin_invitation_sent, can_become_admin, can_join, get_user_membership_of_chatroom,
    has_admin_invite_privileges, has_chatroom_tag_privileges, has_member_invite_privileges,
    is_admin, is_member, is_owner, member_invitation_sent, relation_of,
};
pub use store::RelationStore;
pub use transitions::{
    accept_admin_invite, establish_owner, join_chatroom, leave_chatroom, quit_admin,
    reject_admin_invitation, reject_chatroom_invitation, send_admin_invitation,
    send_member_invitation,
};
