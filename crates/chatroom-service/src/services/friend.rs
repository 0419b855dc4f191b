//! Friend service
//!
//! Friend requests and friendships, persisted per pair with the same
//! expected-state check as chatroom relations.

use chatroom_core::entities::User;
use chatroom_core::friendship::{self, friend_links, friends_consistent};
use chatroom_core::FriendRequestOutcome;
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Friend service
pub struct FriendService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FriendService<'a> {
    /// Create a new FriendService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn persist(&self, first: &mut User, second: &mut User, next: (User, User)) -> ServiceResult<()> {
        let expected = friend_links(first, second);
        let (next_first, next_second) = next;
        debug_assert!(friends_consistent(&next_first, &next_second));

        self.ctx
            .user_repo()
            .save_friendship(&next_first, &next_second, expected)
            .await?;

        *first = next_first;
        *second = next_second;
        Ok(())
    }

    /// Send a friend request, or accept the requestee's pending one
    #[instrument(skip_all, fields(requestor = %requestor.username, requestee = %requestee.username))]
    pub async fn add_friend(
        &self,
        requestor: &mut User,
        requestee: &mut User,
    ) -> ServiceResult<FriendRequestOutcome> {
        let mut next_requestor = requestor.clone();
        let mut next_requestee = requestee.clone();
        let outcome = friendship::add_friend(&mut next_requestor, &mut next_requestee)?;

        self.persist(requestor, requestee, (next_requestor, next_requestee))
            .await?;

        info!(?outcome, "Friend request handled");
        Ok(outcome)
    }

    /// Withdraw or decline a friend request
    ///
    /// Returns `false` without writing anything when no request was pending.
    #[instrument(skip_all, fields(requestor = %requestor.username, requestee = %requestee.username))]
    pub async fn delete_friend_request(
        &self,
        requestor: &mut User,
        requestee: &mut User,
    ) -> ServiceResult<bool> {
        let mut next_requestor = requestor.clone();
        let mut next_requestee = requestee.clone();
        if !friendship::delete_friend_request(&mut next_requestor, &mut next_requestee) {
            return Ok(false);
        }

        self.persist(requestor, requestee, (next_requestor, next_requestee))
            .await?;

        info!("Friend request deleted");
        Ok(true)
    }

    /// End a friendship
    #[instrument(skip_all, fields(first = %a.username, second = %b.username))]
    pub async fn delete_friendship(&self, a: &mut User, b: &mut User) -> ServiceResult<()> {
        let mut next_a = a.clone();
        let mut next_b = b.clone();
        friendship::delete_friendship(&mut next_a, &mut next_b)?;

        self.persist(a, b, (next_a, next_b)).await?;

        info!("Friendship deleted");
        Ok(())
    }

    pub fn are_friends(&self, a: &User, b: &User) -> bool {
        friendship::are_friends(a, b)
    }

    pub fn friend_request_sent(&self, requestor: &User, requestee: &User) -> bool {
        friendship::friend_request_sent(requestor, requestee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatroom_core::error::DomainError;
    use chatroom_core::value_objects::Username;
    use chatroom_db::InMemoryStore;

    use crate::services::error::ServiceError;

    async fn setup() -> (ServiceContext, User, User) {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let alice = User::new(Username::parse("alice").unwrap(), "Alice");
        let bob = User::new(Username::parse("bob").unwrap(), "Bob");
        ctx.user_repo().create(&alice).await.unwrap();
        ctx.user_repo().create(&bob).await.unwrap();
        (ctx, alice, bob)
    }

    #[tokio::test]
    async fn test_reciprocal_requests_become_friendship() {
        let (ctx, mut alice, mut bob) = setup().await;
        let service = FriendService::new(&ctx);

        let outcome = service.add_friend(&mut alice, &mut bob).await.unwrap();
        assert_eq!(outcome, FriendRequestOutcome::Requested);
        assert!(service.friend_request_sent(&alice, &bob));

        let err = service.add_friend(&mut alice, &mut bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::FriendRequestPending)));

        let outcome = service.add_friend(&mut bob, &mut alice).await.unwrap();
        assert_eq!(outcome, FriendRequestOutcome::Befriended);
        assert!(service.are_friends(&alice, &bob));
        assert!(!service.friend_request_sent(&alice, &bob));

        let stored = ctx
            .user_repo()
            .find_by_username(&bob.username)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.friends.contains(&alice.username));
        assert!(stored.friend_requestors.is_empty());
    }

    #[tokio::test]
    async fn test_self_friendship_rejected() {
        let (ctx, mut alice, _) = setup().await;
        let service = FriendService::new(&ctx);
        let mut mirror = alice.clone();

        let err = service.add_friend(&mut alice, &mut mirror).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::CannotBefriendSelf)));
    }

    #[tokio::test]
    async fn test_delete_request_and_friendship() {
        let (ctx, mut alice, mut bob) = setup().await;
        let service = FriendService::new(&ctx);

        assert!(!service.delete_friend_request(&mut alice, &mut bob).await.unwrap());

        service.add_friend(&mut alice, &mut bob).await.unwrap();
        assert!(service.delete_friend_request(&mut alice, &mut bob).await.unwrap());
        assert!(!service.friend_request_sent(&alice, &bob));

        let err = service.delete_friendship(&mut alice, &mut bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFriends)));

        service.add_friend(&mut alice, &mut bob).await.unwrap();
        service.add_friend(&mut bob, &mut alice).await.unwrap();
        service.delete_friendship(&mut alice, &mut bob).await.unwrap();
        assert!(!service.are_friends(&alice, &bob));
    }

    #[tokio::test]
    async fn test_stale_friend_state_is_refused() {
        let (ctx, mut alice, mut bob) = setup().await;
        let service = FriendService::new(&ctx);
        let mut stale_alice = alice.clone();
        let mut stale_bob = bob.clone();

        service.add_friend(&mut alice, &mut bob).await.unwrap();

        let err = service
            .add_friend(&mut stale_bob, &mut stale_alice)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONCURRENT_MODIFICATION");
        assert!(stale_bob.friend_requestees.is_empty());
    }
}
