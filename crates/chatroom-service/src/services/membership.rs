//! Membership service
//!
//! Transactional entry point for every user/chatroom relation change. A
//! transition is computed on copies of the two aggregates, the resulting pair
//! state is saved in one repository call, and the caller's aggregates are
//! updated only after that call succeeds.

use chatroom_core::entities::{Chatroom, User};
use chatroom_core::error::DomainError;
use chatroom_core::membership::{
    self, has_admin_invite_privileges, has_member_invite_privileges, is_consistent,
    relation_of, relations_between,
};
use chatroom_core::ChatroomUserRelation;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Membership service
pub struct MembershipService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MembershipService<'a> {
    /// Create a new MembershipService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply `transition` to the pair and persist it
    async fn commit<F>(&self, user: &mut User, chatroom: &mut Chatroom, transition: F) -> ServiceResult<()>
    where
        F: FnOnce(&mut User, &mut Chatroom, DateTime<Utc>) -> Result<(), DomainError>,
    {
        let expected = relations_between(user, chatroom);
        let mut next_user = user.clone();
        let mut next_chatroom = chatroom.clone();

        transition(&mut next_user, &mut next_chatroom, Utc::now())?;
        debug_assert!(is_consistent(&next_user, &next_chatroom));

        self.ctx
            .chatroom_repo()
            .save_relations(&next_user, &next_chatroom, expected)
            .await?;

        *user = next_user;
        *chatroom = next_chatroom;
        Ok(())
    }

    /// Highest standing of the user in the chatroom
    pub fn relation(&self, user: &User, chatroom: &Chatroom) -> ChatroomUserRelation {
        relation_of(user, chatroom)
    }

    /// Invite `invitee` to join the chatroom
    #[instrument(skip_all, fields(inviter = %inviter.username, invitee = %invitee.username, chatroom = %chatroom.name))]
    pub async fn send_member_invitation(
        &self,
        inviter: &User,
        invitee: &mut User,
        chatroom: &mut Chatroom,
    ) -> ServiceResult<()> {
        if !has_member_invite_privileges(inviter, chatroom) {
            debug!("inviter lacks member invite privileges");
            return Err(DomainError::InsufficientPrivileges.into());
        }

        self.commit(invitee, chatroom, membership::send_member_invitation)
            .await?;

        info!("Member invitation sent");
        Ok(())
    }

    /// Invite `invitee` to become an administrator
    ///
    /// Non-members also receive a member invitation.
    #[instrument(skip_all, fields(inviter = %inviter.username, invitee = %invitee.username, chatroom = %chatroom.name))]
    pub async fn send_admin_invitation(
        &self,
        inviter: &User,
        invitee: &mut User,
        chatroom: &mut Chatroom,
    ) -> ServiceResult<()> {
        if !has_admin_invite_privileges(inviter, chatroom) {
            debug!("inviter lacks admin invite privileges");
            return Err(DomainError::InsufficientPrivileges.into());
        }
        if inviter.username == invitee.username {
            return Err(DomainError::CannotInviteSelf.into());
        }

        self.commit(invitee, chatroom, membership::send_admin_invitation)
            .await?;

        info!("Admin invitation sent");
        Ok(())
    }

    /// Join a chatroom
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn join_chatroom(&self, user: &mut User, chatroom: &mut Chatroom) -> ServiceResult<()> {
        self.commit(user, chatroom, membership::join_chatroom).await?;
        info!("User joined chatroom");
        Ok(())
    }

    /// Accept a pending admin invitation
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn accept_admin_invite(
        &self,
        user: &mut User,
        chatroom: &mut Chatroom,
    ) -> ServiceResult<()> {
        self.commit(user, chatroom, membership::accept_admin_invite)
            .await?;
        info!("Admin invitation accepted");
        Ok(())
    }

    /// Decline a member invitation together with any admin invitation
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn reject_chatroom_invitation(
        &self,
        user: &mut User,
        chatroom: &mut Chatroom,
    ) -> ServiceResult<()> {
        self.commit(user, chatroom, |u, c, _| {
            membership::reject_chatroom_invitation(u, c)
        })
        .await?;
        info!("Chatroom invitation rejected");
        Ok(())
    }

    /// Decline only the admin invitation
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn reject_admin_invitation(
        &self,
        user: &mut User,
        chatroom: &mut Chatroom,
    ) -> ServiceResult<()> {
        self.commit(user, chatroom, |u, c, _| {
            membership::reject_admin_invitation(u, c)
        })
        .await?;
        info!("Admin invitation rejected");
        Ok(())
    }

    /// Leave a chatroom
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn leave_chatroom(&self, user: &mut User, chatroom: &mut Chatroom) -> ServiceResult<()> {
        self.commit(user, chatroom, |u, c, _| membership::leave_chatroom(u, c))
            .await?;
        info!("User left chatroom");
        Ok(())
    }

    /// Step down as administrator
    #[instrument(skip_all, fields(username = %user.username, chatroom = %chatroom.name))]
    pub async fn quit_admin(&self, user: &mut User, chatroom: &mut Chatroom) -> ServiceResult<()> {
        self.commit(user, chatroom, |u, c, _| membership::quit_admin(u, c))
            .await?;
        info!("User quit admin");
        Ok(())
    }
}
