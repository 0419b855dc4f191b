//! Database models - SQLx-compatible structs for PostgreSQL tables

mod chatroom;
mod relation;
mod user;

pub use chatroom::ChatroomModel;
pub use relation::{MembershipModel, RelationModel};
pub use user::UserModel;
