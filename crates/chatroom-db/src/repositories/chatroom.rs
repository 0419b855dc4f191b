//! PostgreSQL implementation of ChatroomRepository

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use chatroom_core::entities::{Chatroom, User};
use chatroom_core::error::DomainError;
use chatroom_core::membership::relations_between;
use chatroom_core::traits::{ChatroomRepository, RepoResult};
use chatroom_core::value_objects::{ChatroomName, Relations, TagName};

use crate::mappers::{
    chatroom_from_model, decode_tag, relation_store, stored_kinds, stored_pair_state,
    ChatroomUpdate,
};
use crate::models::{ChatroomModel, RelationModel};

use super::error::{chatroom_not_found, map_db_error, map_unique_violation, user_not_found, TxError};
use super::tag::replace_chatroom_tags;
use super::transaction::{begin_serializable, retry_serializable, DEFAULT_SERIALIZATION_RETRIES};

const CHATROOM_COLUMNS: &str = r"
    name, display_name, description, listed, invite_only, owner, created_at, last_message_received
";

/// PostgreSQL implementation of ChatroomRepository
#[derive(Clone)]
pub struct PgChatroomRepository {
    pool: PgPool,
    serialization_retries: u32,
}

impl PgChatroomRepository {
    /// Create a new PgChatroomRepository
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            serialization_retries: DEFAULT_SERIALIZATION_RETRIES,
        }
    }

    /// Override how often conflicting relation saves are retried
    pub fn with_serialization_retries(mut self, retries: u32) -> Self {
        self.serialization_retries = retries;
        self
    }

    /// Attach tags and relation sets to a chatroom row
    async fn hydrate(&self, model: ChatroomModel) -> RepoResult<Chatroom> {
        let mut chatroom = chatroom_from_model(model)?;

        let tags = sqlx::query_scalar::<_, String>(
            r"
            SELECT tag_name FROM chatroom_tags WHERE chatroom_name = $1
            ",
        )
        .bind(chatroom.name.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        chatroom.tags = tags
            .into_iter()
            .map(decode_tag)
            .collect::<RepoResult<BTreeSet<_>>>()?;

        let rows = sqlx::query_as::<_, RelationModel>(
            r"
            SELECT username, chatroom_name, kind
            FROM chatroom_relations
            WHERE chatroom_name = $1
            ",
        )
        .bind(chatroom.name.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        relation_store(rows)?.project_chatroom(&mut chatroom);
        Ok(chatroom)
    }

    async fn hydrate_all(&self, models: Vec<ChatroomModel>) -> RepoResult<Vec<Chatroom>> {
        let mut chatrooms = Vec::with_capacity(models.len());
        for model in models {
            chatrooms.push(self.hydrate(model).await?);
        }
        Ok(chatrooms)
    }

    /// Write the pair's relation rows and membership row to match the aggregates
    async fn write_pair(
        conn: &mut PgConnection,
        user: &User,
        chatroom: &Chatroom,
    ) -> Result<(), sqlx::Error> {
        let username = user.username.as_str();
        let name = chatroom.name.as_str();

        sqlx::query(
            r"
            DELETE FROM chatroom_relations WHERE username = $1 AND chatroom_name = $2
            ",
        )
        .bind(username)
        .bind(name)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r"
            INSERT INTO chatroom_relations (username, chatroom_name, kind)
            SELECT $1, $2, UNNEST($3::text[])
            ",
        )
        .bind(username)
        .bind(name)
        .bind(stored_kinds(relations_between(user, chatroom)))
        .execute(&mut *conn)
        .await?;

        match user.membership(&chatroom.name) {
            Some(membership) => {
                sqlx::query(
                    r"
                    INSERT INTO memberships (username, chatroom_name, last_read, when_joined)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (username, chatroom_name)
                    DO UPDATE SET last_read = EXCLUDED.last_read, when_joined = EXCLUDED.when_joined
                    ",
                )
                .bind(username)
                .bind(name)
                .bind(membership.last_read)
                .bind(membership.when_joined)
                .execute(&mut *conn)
                .await?;
            }
            None => {
                sqlx::query(
                    r"
                    DELETE FROM memberships WHERE username = $1 AND chatroom_name = $2
                    ",
                )
                .bind(username)
                .bind(name)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    async fn try_save_relations(
        &self,
        user: &User,
        chatroom: &Chatroom,
        expected: Relations,
    ) -> Result<(), TxError> {
        let username = user.username.as_str();
        let name = chatroom.name.as_str();
        let mut tx = begin_serializable(&self.pool).await?;

        let owner = sqlx::query_scalar::<_, String>(
            r"
            SELECT owner FROM chatrooms WHERE name = $1 FOR UPDATE
            ",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| chatroom_not_found(name))?;

        sqlx::query_scalar::<_, String>(
            r"
            SELECT username FROM users WHERE username = $1 AND is_active FOR UPDATE
            ",
        )
        .bind(username)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| user_not_found(username))?;

        let kinds = sqlx::query_scalar::<_, String>(
            r"
            SELECT kind FROM chatroom_relations WHERE username = $1 AND chatroom_name = $2
            ",
        )
        .bind(username)
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;

        let stored = stored_pair_state(&kinds, owner == username)?;
        if stored != expected {
            debug!(%stored, %expected, "stored pair state differs");
            return Err(DomainError::ConcurrentModification.into());
        }

        Self::write_pair(&mut tx, user, chatroom).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ChatroomRepository for PgChatroomRepository {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &ChatroomName) -> RepoResult<Option<Chatroom>> {
        let model = sqlx::query_as::<_, ChatroomModel>(&format!(
            "SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE name = $1"
        ))
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match model {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn name_exists(&self, name: &ChatroomName) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM chatrooms WHERE name = $1)
            ",
        )
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> RepoResult<Vec<Chatroom>> {
        let models = sqlx::query_as::<_, ChatroomModel>(&format!(
            "SELECT {CHATROOM_COLUMNS} FROM chatrooms ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.hydrate_all(models).await
    }

    #[instrument(skip(self))]
    async fn find_listed(&self) -> RepoResult<Vec<Chatroom>> {
        let models = sqlx::query_as::<_, ChatroomModel>(&format!(
            "SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE listed ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.hydrate_all(models).await
    }

    #[instrument(skip(self))]
    async fn find_listed_with_tag(&self, tag: &TagName) -> RepoResult<Vec<Chatroom>> {
        let models = sqlx::query_as::<_, ChatroomModel>(
            r"
            SELECT c.name, c.display_name, c.description, c.listed, c.invite_only,
                   c.owner, c.created_at, c.last_message_received
            FROM chatrooms c
            JOIN chatroom_tags ct ON ct.chatroom_name = c.name
            WHERE c.listed AND ct.tag_name = $1
            ORDER BY c.name
            ",
        )
        .bind(tag.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.hydrate_all(models).await
    }

    #[instrument(skip(self, chatroom, owner), fields(chatroom = %chatroom.name, owner = %owner.username))]
    async fn create(&self, chatroom: &Chatroom, owner: &User) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Holds off a concurrent deactivation of the owner
        sqlx::query_scalar::<_, String>(
            r"
            SELECT username FROM users WHERE username = $1 AND is_active FOR UPDATE
            ",
        )
        .bind(owner.username.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| user_not_found(owner.username.as_str()))?;

        sqlx::query(
            r"
            INSERT INTO chatrooms (name, display_name, description, listed, invite_only, owner, created_at, last_message_received)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(chatroom.name.as_str())
        .bind(&chatroom.display_name)
        .bind(&chatroom.description)
        .bind(chatroom.listed)
        .bind(chatroom.invite_only)
        .bind(chatroom.owner.as_str())
        .bind(chatroom.created_at)
        .bind(chatroom.last_message_received)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || DomainError::ChatroomNameTaken(chatroom.name.clone()))
        })?;

        Self::write_pair(&mut tx, owner, chatroom)
            .await
            .map_err(map_db_error)?;

        replace_chatroom_tags(&mut tx, &chatroom.name, &chatroom.tags)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, chatroom), fields(chatroom = %chatroom.name))]
    async fn save(&self, chatroom: &Chatroom) -> RepoResult<()> {
        let update = ChatroomUpdate::new(chatroom);

        let result = sqlx::query(
            r"
            UPDATE chatrooms
            SET display_name = $2, description = $3, listed = $4, invite_only = $5,
                last_message_received = $6
            WHERE name = $1
            ",
        )
        .bind(update.name)
        .bind(update.display_name)
        .bind(update.description)
        .bind(update.listed)
        .bind(update.invite_only)
        .bind(update.last_message_received)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(chatroom_not_found(update.name));
        }

        Ok(())
    }

    #[instrument(skip(self, chatroom), fields(chatroom = %chatroom.name))]
    async fn save_details(&self, chatroom: &Chatroom) -> RepoResult<()> {
        let update = ChatroomUpdate::new(chatroom);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r"
            UPDATE chatrooms
            SET display_name = $2, description = $3, listed = $4, invite_only = $5,
                last_message_received = $6
            WHERE name = $1
            ",
        )
        .bind(update.name)
        .bind(update.display_name)
        .bind(update.description)
        .bind(update.listed)
        .bind(update.invite_only)
        .bind(update.last_message_received)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(chatroom_not_found(update.name));
        }

        replace_chatroom_tags(&mut tx, &chatroom.name, &chatroom.tags)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, user, chatroom), fields(username = %user.username, chatroom = %chatroom.name))]
    async fn save_relations(
        &self,
        user: &User,
        chatroom: &Chatroom,
        expected: Relations,
    ) -> RepoResult<()> {
        retry_serializable("save_relations", self.serialization_retries, || {
            self.try_save_relations(user, chatroom, expected)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &ChatroomName) -> RepoResult<()> {
        // Relations, memberships and tag links cascade
        let result = sqlx::query(
            r"
            DELETE FROM chatrooms WHERE name = $1
            ",
        )
        .bind(name.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(chatroom_not_found(name.as_str()));
        }

        Ok(())
    }
}
