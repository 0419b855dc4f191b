//! Error handling utilities for repositories

use chatroom_core::error::DomainError;
use sqlx::Error as SqlxError;

/// SQLSTATE codes Postgres reports when a serializable transaction loses a race
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Check whether the transaction can simply be run again
pub fn is_serialization_failure(e: &SqlxError) -> bool {
    e.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
}

/// Failure inside a retryable transaction
#[derive(Debug)]
pub enum TxError {
    /// Database failure, possibly a retryable conflict
    Sqlx(SqlxError),
    /// Domain rejection; never retried
    Domain(DomainError),
}

impl From<SqlxError> for TxError {
    fn from(e: SqlxError) -> Self {
        Self::Sqlx(e)
    }
}

impl From<DomainError> for TxError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<TxError> for DomainError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Sqlx(e) => map_db_error(e),
            TxError::Domain(e) => e,
        }
    }
}

/// Create a "user not found" error
pub fn user_not_found(username: &str) -> DomainError {
    DomainError::UserNotFound(username.to_string())
}

/// Create a "chatroom not found" error
pub fn chatroom_not_found(name: &str) -> DomainError {
    DomainError::ChatroomNotFound(name.to_string())
}
