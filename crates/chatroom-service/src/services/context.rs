//! Service context - dependency container for services
//!
//! Holds the repositories needed by services behind trait objects so the
//! same services run against PostgreSQL or the in-memory store.

use std::sync::Arc;

use chatroom_common::DatabaseConfig;
use chatroom_core::traits::{ChatroomRepository, TagRepository, UserRepository};
use chatroom_db::{InMemoryStore, PgChatroomRepository, PgPool, PgTagRepository, PgUserRepository};

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    user_repo: Arc<dyn UserRepository>,
    chatroom_repo: Arc<dyn ChatroomRepository>,
    tag_repo: Arc<dyn TagRepository>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        chatroom_repo: Arc<dyn ChatroomRepository>,
        tag_repo: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            user_repo,
            chatroom_repo,
            tag_repo,
        }
    }

    /// Context backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool, config: &DatabaseConfig) -> Self {
        let retries = config.serialization_retries;
        Self::new(
            Arc::new(PgUserRepository::new(pool.clone()).with_serialization_retries(retries)),
            Arc::new(PgChatroomRepository::new(pool.clone()).with_serialization_retries(retries)),
            Arc::new(PgTagRepository::new(pool)),
        )
    }

    /// Context backed by an in-memory store
    ///
    /// The store is shared, so callers keeping a clone see every write.
    pub fn in_memory(store: &InMemoryStore) -> Self {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    // === Repositories ===

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the chatroom repository
    pub fn chatroom_repo(&self) -> &dyn ChatroomRepository {
        self.chatroom_repo.as_ref()
    }

    /// Get the tag repository
    pub fn tag_repo(&self) -> &dyn TagRepository {
        self.tag_repo.as_ref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .finish()
    }
}

/// Builder for creating ServiceContext with custom repositories
#[derive(Default)]
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    chatroom_repo: Option<Arc<dyn ChatroomRepository>>,
    tag_repo: Option<Arc<dyn TagRepository>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn chatroom_repo(mut self, repo: Arc<dyn ChatroomRepository>) -> Self {
        self.chatroom_repo = Some(repo);
        self
    }

    pub fn tag_repo(mut self, repo: Arc<dyn TagRepository>) -> Self {
        self.tag_repo = Some(repo);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Internal` if any repository is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.user_repo
                .ok_or_else(|| ServiceError::internal("user_repo is required"))?,
            self.chatroom_repo
                .ok_or_else(|| ServiceError::internal("chatroom_repo is required"))?,
            self.tag_repo
                .ok_or_else(|| ServiceError::internal("tag_repo is required"))?,
        ))
    }
}
