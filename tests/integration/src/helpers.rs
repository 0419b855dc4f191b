//! Test helpers for integration tests
//!
//! Builds service contexts over either storage backend and reloads
//! aggregates so tests can compare in-memory values with what was stored.

use anyhow::{Context, Result};
use chatroom_common::AppConfig;
use chatroom_core::entities::{Chatroom, User};
use chatroom_core::membership::{is_consistent, relations_between};
use chatroom_db::{create_pool, run_migrations, InMemoryStore};
use chatroom_service::dto::{CreateChatroomRequest, CreateUserRequest};
use chatroom_service::{ChatroomService, ServiceContext, UserService};

/// Service context plus a name for assertion messages
pub struct TestApp {
    pub backend: &'static str,
    pub ctx: ServiceContext,
}

impl TestApp {
    /// App over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self {
            backend: "memory",
            ctx: ServiceContext::in_memory(&InMemoryStore::new()),
        }
    }

    /// App over PostgreSQL, or `None` when no database is configured
    pub async fn postgres() -> Result<Option<Self>> {
        if !check_test_env() {
            return Ok(None);
        }

        let config = test_config()?;
        let pool = create_pool(&config.database)
            .await
            .context("connecting to DATABASE_URL")?;
        run_migrations(&pool).await.context("running migrations")?;

        Ok(Some(Self {
            backend: "postgres",
            ctx: ServiceContext::postgres(pool, &config.database),
        }))
    }

    /// Every backend available in this environment
    pub async fn all() -> Result<Vec<Self>> {
        let mut apps = vec![Self::in_memory()];
        apps.extend(Self::postgres().await?);
        Ok(apps)
    }

    pub async fn register(&self, request: CreateUserRequest) -> Result<User> {
        Ok(UserService::new(&self.ctx).register_user(request).await?)
    }

    pub async fn create_chatroom(
        &self,
        owner: &mut User,
        request: CreateChatroomRequest,
    ) -> Result<Chatroom> {
        Ok(ChatroomService::new(&self.ctx)
            .create_chatroom(owner, request)
            .await?)
    }

    /// Stored state of a user, including deactivated ones
    pub async fn reload_user(&self, user: &User) -> Result<User> {
        self.ctx
            .user_repo()
            .find_by_username(&user.username)
            .await?
            .with_context(|| format!("user {} vanished", user.username))
    }

    pub async fn reload_chatroom(&self, chatroom: &Chatroom) -> Result<Chatroom> {
        Ok(ChatroomService::new(&self.ctx)
            .find_by_name(&chatroom.name)
            .await?)
    }

    /// Assert the pair is symmetric and matches what storage holds
    pub async fn assert_pair_persisted(&self, user: &User, chatroom: &Chatroom) -> Result<()> {
        anyhow::ensure!(
            is_consistent(user, chatroom),
            "[{}] in-memory pair {}/{} is asymmetric",
            self.backend,
            user.username,
            chatroom.name
        );

        let stored_user = self.reload_user(user).await?;
        let stored_chatroom = self.reload_chatroom(chatroom).await?;
        anyhow::ensure!(
            is_consistent(&stored_user, &stored_chatroom),
            "[{}] stored pair {}/{} is asymmetric",
            self.backend,
            user.username,
            chatroom.name
        );
        anyhow::ensure!(
            relations_between(user, chatroom) == relations_between(&stored_user, &stored_chatroom),
            "[{}] stored relations {} differ from {}",
            self.backend,
            relations_between(&stored_user, &stored_chatroom),
            relations_between(user, chatroom)
        );
        Ok(())
    }
}

/// Load the application configuration for tests
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Helper to check if a test database is available
pub fn check_test_env() -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping PostgreSQL backend: DATABASE_URL not set");
        return false;
    }
    true
}
