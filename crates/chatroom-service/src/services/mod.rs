//! Business logic services
//!
//! Services borrow a [`ServiceContext`] and orchestrate the pure rules in
//! `chatroom_core` with the repository ports.

pub mod chatroom;
pub mod context;
pub mod error;
pub mod friend;
pub mod membership;
pub mod tag;
pub mod user;

pub use chatroom::ChatroomService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use friend::FriendService;
pub use membership::MembershipService;
pub use tag::TagService;
pub use user::UserService;
