//! Friend requests and friendships between two users
//!
//! Like chatroom relations, friend relations are recorded on both users and
//! only edited here.

use crate::entities::User;
use crate::error::DomainError;
use crate::value_objects::FriendLinks;

/// Result of [`add_friend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestOutcome {
    /// A new request is pending
    Requested,
    /// The other user had already asked, so the two are now friends
    Befriended,
}

/// Friend state of the pair, seen from `first`
pub fn friend_links(first: &User, second: &User) -> FriendLinks {
    let mut links = FriendLinks::empty();
    if are_friends(first, second) {
        links |= FriendLinks::FRIENDS;
    }
    if friend_request_sent(first, second) {
        links |= FriendLinks::FIRST_REQUESTED;
    }
    if friend_request_sent(second, first) {
        links |= FriendLinks::SECOND_REQUESTED;
    }
    links
}

pub fn are_friends(a: &User, b: &User) -> bool {
    a.friends.contains(&b.username) && b.friends.contains(&a.username)
}

/// Check if `requestor` has a pending request to `requestee`
pub fn friend_request_sent(requestor: &User, requestee: &User) -> bool {
    requestor.friend_requestees.contains(&requestee.username)
        && requestee.friend_requestors.contains(&requestor.username)
}

/// Check that both users record the same friend relations about each other
pub fn friends_consistent(a: &User, b: &User) -> bool {
    a.friends.contains(&b.username) == b.friends.contains(&a.username)
        && a.friend_requestees.contains(&b.username) == b.friend_requestors.contains(&a.username)
        && b.friend_requestees.contains(&a.username) == a.friend_requestors.contains(&b.username)
}

fn remove_request(requestor: &mut User, requestee: &mut User) -> bool {
    let sent = requestor.friend_requestees.remove(&requestee.username);
    let received = requestee.friend_requestors.remove(&requestor.username);
    sent || received
}

/// Send a friend request, or accept the other user's pending one
pub fn add_friend(
    requestor: &mut User,
    requestee: &mut User,
) -> Result<FriendRequestOutcome, DomainError> {
    if requestor.username == requestee.username {
        return Err(DomainError::CannotBefriendSelf);
    }
    if friend_request_sent(requestor, requestee) {
        return Err(DomainError::FriendRequestPending);
    }
    if are_friends(requestor, requestee) {
        return Err(DomainError::AlreadyFriends);
    }

    if friend_request_sent(requestee, requestor) {
        remove_request(requestee, requestor);
        requestor.friends.insert(requestee.username.clone());
        requestee.friends.insert(requestor.username.clone());
        return Ok(FriendRequestOutcome::Befriended);
    }

    requestor
        .friend_requestees
        .insert(requestee.username.clone());
    requestee
        .friend_requestors
        .insert(requestor.username.clone());
    Ok(FriendRequestOutcome::Requested)
}

/// Withdraw or decline a friend request; returns `false` if none was pending
pub fn delete_friend_request(requestor: &mut User, requestee: &mut User) -> bool {
    remove_request(requestor, requestee)
}

/// End a friendship
pub fn delete_friendship(a: &mut User, b: &mut User) -> Result<(), DomainError> {
    if !are_friends(a, b) {
        return Err(DomainError::NotFriends);
    }
    a.friends.remove(&b.username);
    b.friends.remove(&a.username);
    Ok(())
}
