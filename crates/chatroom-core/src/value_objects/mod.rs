//! Value objects - immutable types that represent domain concepts

mod names;
mod relations;

pub use names::{ChatroomName, TagName, Username, MAX_NAME_LENGTH, MAX_TAG_LENGTH};
pub use relations::{FriendLinks, RelationKind, Relations};
