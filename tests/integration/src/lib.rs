//! Integration test utilities for the chatroom services
//!
//! Runs the service layer end to end against the in-memory store, and against
//! PostgreSQL when `DATABASE_URL` is set.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
