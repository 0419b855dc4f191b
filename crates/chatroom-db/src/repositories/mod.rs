//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in chatroom-core.
//! Relation and friendship saves run in serializable transactions and are
//! retried when Postgres reports a serialization conflict.

mod chatroom;
mod error;
mod tag;
mod transaction;
mod user;

pub use chatroom::PgChatroomRepository;
pub use tag::PgTagRepository;
pub use transaction::DEFAULT_SERIALIZATION_RETRIES;
pub use user::PgUserRepository;
