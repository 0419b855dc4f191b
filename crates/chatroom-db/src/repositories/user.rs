//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use chatroom_core::entities::User;
use chatroom_core::error::DomainError;
use chatroom_core::friendship::friend_links;
use chatroom_core::membership::RelationStore;
use chatroom_core::traits::{RepoResult, UserRepository};
use chatroom_core::value_objects::{FriendLinks, RelationKind, Username};

use crate::mappers::{
    decode_chatroom_name, membership_from_model, relation_store, user_from_model, username_set,
};
use crate::models::{MembershipModel, RelationModel, UserModel};

use super::error::{map_db_error, map_unique_violation, user_not_found, TxError};
use super::transaction::{begin_serializable, retry_serializable, DEFAULT_SERIALIZATION_RETRIES};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
    serialization_retries: u32,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            serialization_retries: DEFAULT_SERIALIZATION_RETRIES,
        }
    }

    /// Override how often conflicting friendship saves are retried
    pub fn with_serialization_retries(mut self, retries: u32) -> Self {
        self.serialization_retries = retries;
        self
    }

    /// Load the chatroom relation sets of a user, ownership included
    async fn load_chatroom_relations(&self, user: &mut User) -> RepoResult<()> {
        let rows = sqlx::query_as::<_, RelationModel>(
            r"
            SELECT username, chatroom_name, kind
            FROM chatroom_relations
            WHERE username = $1
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let owned = sqlx::query_scalar::<_, String>(
            r"
            SELECT name FROM chatrooms WHERE owner = $1
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut store: RelationStore = relation_store(rows)?;
        for name in owned {
            store.insert(&user.username, RelationKind::Owner, &decode_chatroom_name(name)?);
        }
        store.project_user(user);
        Ok(())
    }

    async fn load_memberships(&self, user: &mut User) -> RepoResult<()> {
        let rows = sqlx::query_as::<_, MembershipModel>(
            r"
            SELECT username, chatroom_name, last_read, when_joined
            FROM memberships
            WHERE username = $1
            ORDER BY when_joined, chatroom_name
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        user.memberships = rows
            .into_iter()
            .map(membership_from_model)
            .collect::<RepoResult<_>>()?;
        Ok(())
    }

    async fn load_friends(&self, user: &mut User) -> RepoResult<()> {
        let friends = sqlx::query_scalar::<_, String>(
            r"
            SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END
            FROM friendships
            WHERE user_a = $1 OR user_b = $1
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let requestees = sqlx::query_scalar::<_, String>(
            r"
            SELECT requestee FROM friend_requests WHERE requestor = $1
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let requestors = sqlx::query_scalar::<_, String>(
            r"
            SELECT requestor FROM friend_requests WHERE requestee = $1
            ",
        )
        .bind(user.username.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        user.friends = username_set(friends)?;
        user.friend_requestees = username_set(requestees)?;
        user.friend_requestors = username_set(requestors)?;
        Ok(())
    }

    /// Read the stored friend state of the pair, seen from `first`
    async fn stored_friend_links(
        conn: &mut PgConnection,
        first: &str,
        second: &str,
    ) -> Result<FriendLinks, sqlx::Error> {
        let (low, high) = ordered_pair(first, second);
        let (friends, first_requested, second_requested) =
            sqlx::query_as::<_, (bool, bool, bool)>(
                r"
                SELECT
                    EXISTS(SELECT 1 FROM friendships WHERE user_a = $3 AND user_b = $4),
                    EXISTS(SELECT 1 FROM friend_requests WHERE requestor = $1 AND requestee = $2),
                    EXISTS(SELECT 1 FROM friend_requests WHERE requestor = $2 AND requestee = $1)
                ",
            )
            .bind(first)
            .bind(second)
            .bind(low)
            .bind(high)
            .fetch_one(conn)
            .await?;

        let mut links = FriendLinks::empty();
        links.set(FriendLinks::FRIENDS, friends);
        links.set(FriendLinks::FIRST_REQUESTED, first_requested);
        links.set(FriendLinks::SECOND_REQUESTED, second_requested);
        Ok(links)
    }

    async fn try_save_friendship(
        &self,
        first: &User,
        second: &User,
        expected: FriendLinks,
    ) -> Result<(), TxError> {
        let (a, b) = (first.username.as_str(), second.username.as_str());
        let mut tx = begin_serializable(&self.pool).await?;

        // Lock both users in a stable order
        let locked = sqlx::query_scalar::<_, String>(
            r"
            SELECT username FROM users
            WHERE username IN ($1, $2) AND is_active
            ORDER BY username
            FOR UPDATE
            ",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&mut *tx)
        .await?;
        for name in [a, b] {
            if !locked.iter().any(|l| l == name) {
                return Err(user_not_found(name).into());
            }
        }

        let stored = Self::stored_friend_links(&mut tx, a, b).await?;
        if stored != expected {
            return Err(DomainError::ConcurrentModification.into());
        }

        let desired = friend_links(first, second);
        let (low, high) = ordered_pair(a, b);

        sqlx::query(
            r"
            DELETE FROM friendships WHERE user_a = $1 AND user_b = $2
            ",
        )
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            DELETE FROM friend_requests
            WHERE (requestor = $1 AND requestee = $2) OR (requestor = $2 AND requestee = $1)
            ",
        )
        .bind(a)
        .bind(b)
        .execute(&mut *tx)
        .await?;

        if desired.contains(FriendLinks::FRIENDS) {
            sqlx::query(
                r"
                INSERT INTO friendships (user_a, user_b) VALUES ($1, $2)
                ",
            )
            .bind(low)
            .bind(high)
            .execute(&mut *tx)
            .await?;
        }

        for (flag, requestor, requestee) in [
            (FriendLinks::FIRST_REQUESTED, a, b),
            (FriendLinks::SECOND_REQUESTED, b, a),
        ] {
            if desired.contains(flag) {
                sqlx::query(
                    r"
                    INSERT INTO friend_requests (requestor, requestee) VALUES ($1, $2)
                    ",
                )
                .bind(requestor)
                .bind(requestee)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Friendships are stored once per pair with the smaller name first
fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &Username) -> RepoResult<Option<User>> {
        let model = sqlx::query_as::<_, UserModel>(
            r"
            SELECT username, display_name, created_at, is_active
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(model) = model else {
            return Ok(None);
        };

        let mut user = user_from_model(model)?;
        self.load_chatroom_relations(&mut user).await?;
        self.load_memberships(&mut user).await?;
        self.load_friends(&mut user).await?;
        Ok(Some(user))
    }

    #[instrument(skip(self))]
    async fn username_exists(&self, username: &Username) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)
            ",
        )
        .bind(username.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (username, display_name, created_at, is_active)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(user.username.as_str())
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::UsernameTaken(user.username.clone())))?;

        Ok(())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn save(&self, user: &User) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r"
            UPDATE users SET display_name = $2 WHERE username = $1
            ",
        )
        .bind(user.username.as_str())
        .bind(&user.display_name)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user.username.as_str()));
        }

        let (chatrooms, last_read): (Vec<String>, Vec<DateTime<Utc>>) = user
            .memberships
            .iter()
            .map(|m| (m.chatroom_name.to_string(), m.last_read))
            .unzip();

        sqlx::query(
            r"
            UPDATE memberships m
            SET last_read = v.last_read
            FROM UNNEST($2::text[], $3::timestamptz[]) AS v(chatroom_name, last_read)
            WHERE m.username = $1 AND m.chatroom_name = v.chatroom_name
            ",
        )
        .bind(user.username.as_str())
        .bind(chatrooms)
        .bind(last_read)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, first, second), fields(first = %first.username, second = %second.username))]
    async fn save_friendship(
        &self,
        first: &User,
        second: &User,
        expected: FriendLinks,
    ) -> RepoResult<()> {
        retry_serializable("save_friendship", self.serialization_retries, || {
            self.try_save_friendship(first, second, expected)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, username: &Username) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // The row lock serializes against chatroom creation for this owner
        sqlx::query_scalar::<_, String>(
            r"
            SELECT username FROM users WHERE username = $1 FOR UPDATE
            ",
        )
        .bind(username.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| user_not_found(username.as_str()))?;

        let owns_chatrooms = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM chatrooms WHERE owner = $1)
            ",
        )
        .bind(username.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if owns_chatrooms {
            return Err(DomainError::OwnerCannotLeave);
        }

        sqlx::query(
            r"
            UPDATE users SET is_active = FALSE WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for statement in [
            "DELETE FROM chatroom_relations WHERE username = $1",
            "DELETE FROM memberships WHERE username = $1",
            "DELETE FROM friend_requests WHERE requestor = $1 OR requestee = $1",
            "DELETE FROM friendships WHERE user_a = $1 OR user_b = $1",
        ] {
            sqlx::query(statement)
                .bind(username.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgUserRepository>();
    }

    #[test]
    fn test_ordered_pair() {
        assert_eq!(ordered_pair("bob", "alice"), ("alice", "bob"));
        assert_eq!(ordered_pair("alice", "bob"), ("alice", "bob"));
    }
}
