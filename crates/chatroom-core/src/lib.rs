//! # chatroom-core
//!
//! Domain layer containing the user and chatroom aggregates, the membership
//! rules, relation storage helpers, and repository traits.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod friendship;
pub mod membership;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Chatroom, ChatroomUserRelation, Membership, User};
pub use error::{DomainError, ErrorCategory};
pub use friendship::FriendRequestOutcome;
pub use membership::RelationStore;
pub use traits::{ChatroomRepository, RepoResult, TagRepository, UserRepository};
pub use value_objects::{
    ChatroomName, FriendLinks, RelationKind, Relations, TagName, Username, MAX_NAME_LENGTH,
    MAX_TAG_LENGTH,
};
