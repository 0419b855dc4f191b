//! Tag service
//!
//! Chatroom tags and tag-based discovery. Tags exist only while some chatroom
//! uses them.

use std::collections::BTreeSet;

use chatroom_core::entities::{Chatroom, User};
use chatroom_core::error::DomainError;
use chatroom_core::membership::has_chatroom_tag_privileges;
use chatroom_core::value_objects::TagName;
use tracing::{info, instrument};

use super::chatroom::{parse_tags, prune_unused_tags};
use super::context::ServiceContext;
use super::error::ServiceResult;

/// Tag service
pub struct TagService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TagService<'a> {
    /// Create a new TagService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn authorize(actor: &User, chatroom: &Chatroom) -> ServiceResult<()> {
        if has_chatroom_tag_privileges(actor, chatroom) {
            Ok(())
        } else {
            Err(DomainError::InsufficientPrivileges.into())
        }
    }

    /// Store `tags` as the chatroom's tag set and drop orphaned tags
    async fn replace_tags(&self, chatroom: &mut Chatroom, tags: BTreeSet<TagName>) -> ServiceResult<()> {
        self.ctx
            .tag_repo()
            .set_chatroom_tags(&chatroom.name, &tags)
            .await?;
        chatroom.tags = tags;
        let removed = prune_unused_tags(self.ctx).await;

        info!(chatroom = %chatroom.name, tags = chatroom.tags.len(), removed, "Chatroom tags replaced");
        Ok(())
    }

    /// Replace the chatroom's tags
    #[instrument(skip(self, actor, chatroom), fields(actor = %actor.username, chatroom = %chatroom.name))]
    pub async fn set_tags(
        &self,
        actor: &User,
        chatroom: &mut Chatroom,
        names: &[String],
    ) -> ServiceResult<()> {
        Self::authorize(actor, chatroom)?;
        let tags = parse_tags(names)?;
        self.replace_tags(chatroom, tags).await
    }

    /// Add one tag
    #[instrument(skip(self, actor, chatroom), fields(actor = %actor.username, chatroom = %chatroom.name))]
    pub async fn add_tag(&self, actor: &User, chatroom: &mut Chatroom, name: &str) -> ServiceResult<()> {
        Self::authorize(actor, chatroom)?;
        let tag = TagName::parse(name)?;
        if chatroom.has_tag(&tag) {
            return Err(DomainError::TagAlreadyPresent(tag).into());
        }

        let mut tags = chatroom.tags.clone();
        tags.insert(tag);
        self.replace_tags(chatroom, tags).await
    }

    /// Remove one tag
    #[instrument(skip(self, actor, chatroom), fields(actor = %actor.username, chatroom = %chatroom.name))]
    pub async fn remove_tag(&self, actor: &User, chatroom: &mut Chatroom, name: &str) -> ServiceResult<()> {
        Self::authorize(actor, chatroom)?;
        let tag = TagName::parse(name)?;
        if !chatroom.has_tag(&tag) {
            return Err(DomainError::TagNotFound(tag.to_string()).into());
        }

        let mut tags = chatroom.tags.clone();
        tags.remove(&tag);
        self.replace_tags(chatroom, tags).await
    }

    /// Clear every tag of the chatroom
    #[instrument(skip(self, chatroom), fields(chatroom = %chatroom.name))]
    pub async fn remove_all_tags(&self, chatroom: &mut Chatroom) -> ServiceResult<()> {
        self.replace_tags(chatroom, BTreeSet::new()).await
    }

    /// Check whether the chatroom carries a tag
    pub fn chatroom_has_tag(&self, chatroom: &Chatroom, name: &str) -> ServiceResult<bool> {
        Ok(chatroom.has_tag(&TagName::parse(name)?))
    }

    /// Listed chatrooms carrying a tag
    #[instrument(skip(self))]
    pub async fn find_listed_chatrooms_with_tag(&self, name: &str) -> ServiceResult<Vec<Chatroom>> {
        let tag = TagName::parse(name)?;
        Ok(self.ctx.chatroom_repo().find_listed_with_tag(&tag).await?)
    }
}
