//! Serializable transactions with conflict retry

use std::future::Future;

use sqlx::{PgConnection, Postgres, Transaction};
use tracing::warn;

use chatroom_core::traits::RepoResult;

use super::error::{is_serialization_failure, TxError};

/// Default number of retries after a serialization conflict
pub const DEFAULT_SERIALIZATION_RETRIES: u32 = 3;

/// Switch an open transaction to SERIALIZABLE isolation
///
/// Must be the first statement of the transaction.
pub async fn set_serializable(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(conn)
        .await?;
    Ok(())
}

/// Begin a serializable transaction on the pool
pub async fn begin_serializable(
    pool: &sqlx::PgPool,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    set_serializable(&mut tx).await?;
    Ok(tx)
}

/// Run `attempt` until it succeeds, fails for a non-retryable reason, or
/// exhausts `retries` re-runs after serialization conflicts
pub async fn retry_serializable<T, F, Fut>(
    operation: &'static str,
    retries: u32,
    mut attempt: F,
) -> RepoResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TxError>>,
{
    let mut retried = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(TxError::Sqlx(e)) if is_serialization_failure(&e) && retried < retries => {
                retried += 1;
                warn!(operation, attempt = retried, error = %e, "serialization conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
