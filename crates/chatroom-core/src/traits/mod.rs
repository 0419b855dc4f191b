mod repositories;

pub use repositories::{ChatroomRepository, RepoResult, TagRepository, UserRepository};
