//! Chatroom service
//!
//! Handles chatroom lifecycle, metadata updates, and membership records.

use std::collections::BTreeSet;

use chatroom_core::entities::{Chatroom, User};
use chatroom_core::error::DomainError;
use chatroom_core::membership::{
    establish_owner, get_user_membership_of_chatroom, is_admin, is_owner, relation_of,
};
use chatroom_core::value_objects::{ChatroomName, RelationKind, TagName, Username};
use chrono::Utc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{CreateChatroomRequest, MembershipResponse, UpdateChatroomRequest};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Parse raw tag names into a normalized set
pub(crate) fn parse_tags<I, S>(names: I) -> ServiceResult<BTreeSet<TagName>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| TagName::parse(name).map_err(Into::into))
        .collect()
}

/// Drop tags no chatroom uses any more
///
/// Runs after the owning write has committed, so a failure is logged and the
/// orphans are left for the next cleanup.
pub(crate) async fn prune_unused_tags(ctx: &ServiceContext) -> u64 {
    match ctx.tag_repo().delete_unused().await {
        Ok(removed) => removed,
        Err(e) => {
            warn!(error = %e, "Failed to delete unused tags");
            0
        }
    }
}

fn sorted_users(chatroom: &Chatroom, kind: RelationKind) -> Vec<Username> {
    chatroom
        .users(kind)
        .map(|users| users.iter().cloned().collect())
        .unwrap_or_default()
}

/// Chatroom service
pub struct ChatroomService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChatroomService<'a> {
    /// Create a new ChatroomService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get chatroom by name
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &ChatroomName) -> ServiceResult<Chatroom> {
        self.ctx
            .chatroom_repo()
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::ChatroomNotFound(name.to_string()).into())
    }

    /// Check whether a chatroom name is taken
    #[instrument(skip(self))]
    pub async fn chatroom_exists(&self, name: &ChatroomName) -> ServiceResult<bool> {
        Ok(self.ctx.chatroom_repo().name_exists(name).await?)
    }

    /// Create a chatroom owned by `owner`
    ///
    /// The owner becomes owner, administrator and member in one write.
    #[instrument(skip(self, owner, request), fields(owner = %owner.username, chatroom = %request.name))]
    pub async fn create_chatroom(
        &self,
        owner: &mut User,
        request: CreateChatroomRequest,
    ) -> ServiceResult<Chatroom> {
        request.validate()?;

        let name = ChatroomName::parse(request.name)?;
        if self.ctx.chatroom_repo().name_exists(&name).await? {
            return Err(DomainError::ChatroomNameTaken(name).into());
        }

        let mut chatroom = Chatroom::new(
            name,
            request.display_name,
            request.description,
            request.listed,
            request.invite_only,
            owner.username.clone(),
        );
        chatroom.tags = parse_tags(&request.tags)?;

        let created_at = chatroom.created_at;
        let mut next_owner = owner.clone();
        establish_owner(&mut next_owner, &mut chatroom, created_at)?;

        self.ctx
            .chatroom_repo()
            .create(&chatroom, &next_owner)
            .await?;
        *owner = next_owner;

        info!(tags = chatroom.tags.len(), "Chatroom created");
        Ok(chatroom)
    }

    /// Update chatroom metadata and optionally its tags
    #[instrument(skip(self, actor, chatroom, request), fields(actor = %actor.username, chatroom = %chatroom.name))]
    pub async fn update_chatroom(
        &self,
        actor: &User,
        chatroom: &mut Chatroom,
        request: UpdateChatroomRequest,
    ) -> ServiceResult<()> {
        request.validate()?;
        if !is_owner(actor, chatroom) && !is_admin(actor, chatroom) {
            return Err(DomainError::InsufficientPrivileges.into());
        }

        let mut next = chatroom.clone();
        if let Some(display_name) = request.display_name {
            next.display_name = display_name;
        }
        if let Some(description) = request.description {
            next.description = description;
        }
        if let Some(listed) = request.listed {
            next.listed = listed;
        }
        if let Some(invite_only) = request.invite_only {
            next.invite_only = invite_only;
        }
        let tags = request.tags.as_deref().map(parse_tags).transpose()?;

        match tags {
            Some(tags) => {
                next.tags = tags;
                self.ctx.chatroom_repo().save_details(&next).await?;
                *chatroom = next;
                let removed_tags = prune_unused_tags(self.ctx).await;
                info!(removed_tags, "Chatroom updated");
            }
            None => {
                self.ctx.chatroom_repo().save(&next).await?;
                *chatroom = next;
                info!("Chatroom updated");
            }
        }
        Ok(())
    }

    /// Delete a chatroom with every relation, membership and tag link
    #[instrument(skip(self, actor, chatroom), fields(actor = %actor.username, chatroom = %chatroom.name))]
    pub async fn delete_chatroom(&self, actor: &User, chatroom: &Chatroom) -> ServiceResult<()> {
        if !is_owner(actor, chatroom) {
            return Err(DomainError::NotChatroomOwner.into());
        }

        self.ctx.chatroom_repo().delete(&chatroom.name).await?;
        let removed_tags = prune_unused_tags(self.ctx).await;

        info!(removed_tags, "Chatroom deleted");
        Ok(())
    }

    /// All chatrooms
    #[instrument(skip(self))]
    pub async fn list_chatrooms(&self) -> ServiceResult<Vec<Chatroom>> {
        Ok(self.ctx.chatroom_repo().find_all().await?)
    }

    /// Chatrooms shown in the public directory
    #[instrument(skip(self))]
    pub async fn list_listed_chatrooms(&self) -> ServiceResult<Vec<Chatroom>> {
        Ok(self.ctx.chatroom_repo().find_listed().await?)
    }

    /// Record that a message arrived in the chatroom
    #[instrument(skip(self))]
    pub async fn record_message_received(&self, name: &ChatroomName) -> ServiceResult<Chatroom> {
        let mut chatroom = self.find_by_name(name).await?;
        chatroom.touch_last_message(Utc::now());
        self.ctx.chatroom_repo().save(&chatroom).await?;
        Ok(chatroom)
    }

    /// The user's membership record in the chatroom
    pub fn get_membership(&self, user: &User, chatroom: &Chatroom) -> ServiceResult<MembershipResponse> {
        let membership = get_user_membership_of_chatroom(user, chatroom)?;
        Ok(MembershipResponse::new(membership, relation_of(user, chatroom)).with_chatroom(chatroom))
    }

    /// Mark the chatroom as read by the user now
    #[instrument(skip(self, user, chatroom), fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn mark_read(
        &self,
        user: &mut User,
        chatroom: &Chatroom,
    ) -> ServiceResult<MembershipResponse> {
        let mut next = user.clone();
        next.membership_mut(&chatroom.name)
            .ok_or(DomainError::MembershipNotFound)?
            .mark_read(Utc::now());

        self.ctx.user_repo().save(&next).await?;
        *user = next;

        self.get_membership(user, chatroom)
    }

    /// Members, sorted by name
    pub fn members(&self, chatroom: &Chatroom) -> Vec<Username> {
        sorted_users(chatroom, RelationKind::Member)
    }

    /// Administrators, sorted by name
    pub fn administrators(&self, chatroom: &Chatroom) -> Vec<Username> {
        sorted_users(chatroom, RelationKind::Admin)
    }

    /// Users with a pending member invitation, sorted by name
    pub fn member_invitees(&self, chatroom: &Chatroom) -> Vec<Username> {
        sorted_users(chatroom, RelationKind::MemberInvite)
    }

    /// Users with a pending admin invitation, sorted by name
    pub fn admin_invitees(&self, chatroom: &Chatroom) -> Vec<Username> {
        sorted_users(chatroom, RelationKind::AdminInvite)
    }
}
