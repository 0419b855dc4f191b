//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Relation writes are always per pair: the
//! caller passes the state it read, and the adapter refuses the write with
//! [`DomainError::ConcurrentModification`] if storage has moved on since.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::entities::{Chatroom, User};
use crate::error::DomainError;
use crate::value_objects::{ChatroomName, FriendLinks, Relations, TagName, Username};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Load a user with all relation sets and memberships
    async fn find_by_username(&self, username: &Username) -> RepoResult<Option<User>>;

    /// Check if a username is already taken (active or not)
    async fn username_exists(&self, username: &Username) -> RepoResult<bool>;

    /// Create a new user without relations
    async fn create(&self, user: &User) -> RepoResult<()>;

    /// Persist profile fields and membership read timestamps
    async fn save(&self, user: &User) -> RepoResult<()>;

    /// Persist the friend state between `first` and `second`
    ///
    /// `expected` is the state (seen from `first`) the change was computed
    /// from.
    async fn save_friendship(
        &self,
        first: &User,
        second: &User,
        expected: FriendLinks,
    ) -> RepoResult<()>;

    /// Mark the user inactive and drop every relation, membership and
    /// friend link that references them
    ///
    /// Refused with [`DomainError::OwnerCannotLeave`] while storage records
    /// the user as owner of any chatroom.
    async fn deactivate(&self, username: &Username) -> RepoResult<()>;
}

// ============================================================================
// Chatroom Repository
// ============================================================================

#[async_trait]
pub trait ChatroomRepository: Send + Sync {
    /// Load a chatroom with its tags and relation sets
    async fn find_by_name(&self, name: &ChatroomName) -> RepoResult<Option<Chatroom>>;

    async fn name_exists(&self, name: &ChatroomName) -> RepoResult<bool>;

    async fn find_all(&self) -> RepoResult<Vec<Chatroom>>;

    /// Chatrooms visible in public listings
    async fn find_listed(&self) -> RepoResult<Vec<Chatroom>>;

    async fn find_listed_with_tag(&self, tag: &TagName) -> RepoResult<Vec<Chatroom>>;

    /// Create a chatroom together with its owner's relations and membership
    async fn create(&self, chatroom: &Chatroom, owner: &User) -> RepoResult<()>;

    /// Persist chatroom metadata (not relations or tags)
    async fn save(&self, chatroom: &Chatroom) -> RepoResult<()>;

    /// Persist chatroom metadata and replace its tag set in one write
    async fn save_details(&self, chatroom: &Chatroom) -> RepoResult<()>;

    /// Atomically persist every relation of the (user, chatroom) pair plus
    /// the pair's membership record
    ///
    /// Inactive users are reported as [`DomainError::UserNotFound`].
    async fn save_relations(
        &self,
        user: &User,
        chatroom: &Chatroom,
        expected: Relations,
    ) -> RepoResult<()>;

    /// Delete a chatroom with all relations, memberships and tag links
    async fn delete(&self, name: &ChatroomName) -> RepoResult<()>;
}

// ============================================================================
// Tag Repository
// ============================================================================

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn exists(&self, tag: &TagName) -> RepoResult<bool>;

    /// Replace the chatroom's tags, creating unknown tags on demand
    async fn set_chatroom_tags(
        &self,
        chatroom: &ChatroomName,
        tags: &BTreeSet<TagName>,
    ) -> RepoResult<()>;

    /// Delete tags no chatroom uses, returning how many were removed
    async fn delete_unused(&self) -> RepoResult<u64>;
}
