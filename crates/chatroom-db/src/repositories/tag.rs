//! PostgreSQL implementation of TagRepository

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use chatroom_core::traits::{RepoResult, TagRepository};
use chatroom_core::value_objects::{ChatroomName, TagName};

use super::error::map_db_error;

/// PostgreSQL implementation of TagRepository
#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    /// Create a new PgTagRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Replace a chatroom's tag links, creating missing tags
pub(crate) async fn replace_chatroom_tags(
    conn: &mut PgConnection,
    chatroom: &ChatroomName,
    tags: &BTreeSet<TagName>,
) -> Result<(), sqlx::Error> {
    let names: Vec<String> = tags.iter().map(ToString::to_string).collect();

    sqlx::query(
        r"
        INSERT INTO tags (name)
        SELECT UNNEST($1::text[])
        ON CONFLICT (name) DO NOTHING
        ",
    )
    .bind(names.clone())
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        DELETE FROM chatroom_tags WHERE chatroom_name = $1
        ",
    )
    .bind(chatroom.as_str())
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        INSERT INTO chatroom_tags (chatroom_name, tag_name)
        SELECT $1, UNNEST($2::text[])
        ",
    )
    .bind(chatroom.as_str())
    .bind(names)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl TagRepository for PgTagRepository {
    #[instrument(skip(self))]
    async fn exists(&self, tag: &TagName) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM tags WHERE name = $1)
            ",
        )
        .bind(tag.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn set_chatroom_tags(
        &self,
        chatroom: &ChatroomName,
        tags: &BTreeSet<TagName>,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        replace_chatroom_tags(&mut tx, chatroom, tags)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_unused(&self) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM tags t
            WHERE NOT EXISTS (SELECT 1 FROM chatroom_tags ct WHERE ct.tag_name = t.name)
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgTagRepository>();
    }
}
