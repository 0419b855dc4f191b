//! # chatroom-db
//!
//! Storage adapters for the repository traits defined in `chatroom-core`.
//!
//! ## Overview
//!
//! - Connection pool management and runtime migrations
//! - Database models with SQLx `FromRow` derives
//! - Row to aggregate mappers
//! - PostgreSQL repository implementations with serializable pair saves
//! - An in-memory store implementing the same traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatroom_common::DatabaseConfig;
//! use chatroom_db::{create_pool, run_migrations, PgChatroomRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::new("postgres://localhost/chatrooms")).await?;
//!     run_migrations(&pool).await?;
//!     let chatrooms = PgChatroomRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

pub use memory::InMemoryStore;
pub use pool::{create_pool, run_migrations, PgPool};
pub use repositories::{
    PgChatroomRepository, PgTagRepository, PgUserRepository, DEFAULT_SERIALIZATION_RETRIES,
};
