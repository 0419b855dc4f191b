//! In-memory storage backend

mod store;

pub use store::InMemoryStore;
