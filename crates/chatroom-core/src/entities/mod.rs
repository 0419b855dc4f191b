//! Domain entities - core business objects

mod chatroom;
mod membership;
mod user;

pub use chatroom::Chatroom;
pub use membership::{ChatroomUserRelation, Membership};
pub use user::User;
