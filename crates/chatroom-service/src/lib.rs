//! # chatroom-service
//!
//! Application layer containing the chatroom use cases, services, and DTOs.
//!
//! Every mutating service method works on copies of the aggregates it is
//! given, persists the result, and only then updates the caller's values.

pub mod dto;
pub mod services;

pub use services::{
    ChatroomService, FriendService, MembershipService, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult, TagService, UserService,
};
