//! User service
//!
//! Handles user accounts and the overview of a user's relations.

use chatroom_core::entities::User;
use chatroom_core::error::DomainError;
use chatroom_core::value_objects::Username;
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::{CreateUserRequest, UpdateUserRequest, UserRelationsResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// User service
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    /// Create a new UserService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new account
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register_user(&self, request: CreateUserRequest) -> ServiceResult<User> {
        request.validate()?;
        let username = Username::parse(request.username)?;
        if self.ctx.user_repo().username_exists(&username).await? {
            return Err(DomainError::UsernameTaken(username).into());
        }

        let user = User::new(username, request.display_name);
        self.ctx.user_repo().create(&user).await?;

        info!("User registered");
        Ok(user)
    }

    /// Get an active user by name
    ///
    /// Deactivated accounts are reported as unknown.
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &Username) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_username(username)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()).into())
    }

    /// Check whether a username is taken, by an active account or not
    #[instrument(skip(self))]
    pub async fn user_exists(&self, username: &Username) -> ServiceResult<bool> {
        Ok(self.ctx.user_repo().username_exists(username).await?)
    }

    /// Update profile fields; absent fields are left unchanged
    #[instrument(skip(self, user, request), fields(username = %user.username))]
    pub async fn update_user(&self, user: &mut User, request: UpdateUserRequest) -> ServiceResult<()> {
        request.validate()?;

        let mut next = user.clone();
        if let Some(display_name) = request.display_name {
            next.display_name = display_name;
        }

        self.ctx.user_repo().save(&next).await?;
        *user = next;

        info!("User updated");
        Ok(())
    }

    /// Friends, invitations and memberships of the user
    pub fn relations(&self, user: &User) -> UserRelationsResponse {
        UserRelationsResponse::from(user)
    }

    /// Deactivate an account and drop all of its relations
    ///
    /// Owners must delete their chatrooms first. Storage repeats the check
    /// against its own records, so a stale `user` cannot slip past it.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn deactivate_user(&self, user: &mut User) -> ServiceResult<()> {
        if !user.owned_chatrooms.is_empty() {
            return Err(DomainError::OwnerCannotLeave.into());
        }

        self.ctx.user_repo().deactivate(&user.username).await?;
        *user = self
            .ctx
            .user_repo()
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user.username.to_string()))?;

        info!("User deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatroom_core::membership::{is_member, member_invitation_sent};
    use chatroom_core::ChatroomUserRelation;
    use chatroom_db::InMemoryStore;

    use crate::dto::CreateChatroomRequest;
    use crate::services::error::ServiceError;
    use crate::services::{ChatroomService, FriendService, MembershipService};

    fn register(name: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: name.to_string(),
            display_name: name.to_uppercase(),
        }
    }

    fn room(name: &str) -> CreateChatroomRequest {
        CreateChatroomRequest {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            listed: true,
            invite_only: false,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_register_and_find() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let service = UserService::new(&ctx);

        let user = service.register_user(register("alice")).await.unwrap();
        assert_eq!(service.find_by_username(&user.username).await.unwrap(), user);
        assert!(service.user_exists(&user.username).await.unwrap());

        let err = service.register_user(register("alice")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::UsernameTaken(_))));

        let missing = Username::parse("nobody").unwrap();
        let err = service.find_by_username(&missing).await.unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_USER");
    }

    #[tokio::test]
    async fn test_update_user() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let service = UserService::new(&ctx);
        let mut user = service.register_user(register("alice")).await.unwrap();

        let request = UpdateUserRequest {
            display_name: Some("Alice Liddell".to_string()),
        };
        service.update_user(&mut user, request).await.unwrap();
        assert_eq!(user.display_name, "Alice Liddell");

        let err = service
            .update_user(
                &mut user,
                UpdateUserRequest {
                    display_name: Some(String::new()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = service.find_by_username(&user.username).await.unwrap();
        assert_eq!(stored.display_name, "Alice Liddell");
    }

    #[tokio::test]
    async fn test_stale_owner_copy_cannot_deactivate() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let users = UserService::new(&ctx);
        let mut owner = users.register_user(register("olivia")).await.unwrap();
        let mut stale = owner.clone();

        let room = ChatroomService::new(&ctx)
            .create_chatroom(&mut owner, room("lobby"))
            .await
            .unwrap();

        let err = users.deactivate_user(&mut stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::OwnerCannotLeave)));
        assert!(stale.is_active);

        let stored = users.find_by_username(&owner.username).await.unwrap();
        assert!(stored.owned_chatrooms.contains(&room.name));
        assert!(is_member(&stored, &room));
    }

    #[tokio::test]
    async fn test_held_copy_cannot_rejoin_after_deactivation() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let users = UserService::new(&ctx);
        let mut owner = users.register_user(register("olivia")).await.unwrap();
        let mut guest = users.register_user(register("gus")).await.unwrap();
        let mut lobby = ChatroomService::new(&ctx)
            .create_chatroom(&mut owner, room("lobby"))
            .await
            .unwrap();
        let mut held = guest.clone();

        users.deactivate_user(&mut guest).await.unwrap();

        let err = MembershipService::new(&ctx)
            .join_chatroom(&mut held, &mut lobby)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::UserNotFound(_))));
        assert!(!is_member(&held, &lobby));

        let stored = ChatroomService::new(&ctx).find_by_name(&lobby.name).await.unwrap();
        assert!(!stored.members.contains(&guest.username));
    }

    #[tokio::test]
    async fn test_relations_overview() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let users = UserService::new(&ctx);
        let mut owner = users.register_user(register("olivia")).await.unwrap();
        let mut guest = users.register_user(register("gus")).await.unwrap();

        let mut lobby = ChatroomService::new(&ctx)
            .create_chatroom(&mut owner, room("lobby"))
            .await
            .unwrap();
        let mut den = ChatroomService::new(&ctx)
            .create_chatroom(&mut owner, room("den"))
            .await
            .unwrap();
        let membership = MembershipService::new(&ctx);
        membership.join_chatroom(&mut guest, &mut lobby).await.unwrap();
        membership
            .send_member_invitation(&owner, &mut guest, &mut den)
            .await
            .unwrap();
        FriendService::new(&ctx)
            .add_friend(&mut guest, &mut owner)
            .await
            .unwrap();

        let overview = users.relations(&guest);
        assert_eq!(overview.chatroom_invites, vec!["den".to_string()]);
        assert_eq!(overview.friend_requestees, vec!["olivia".to_string()]);
        assert_eq!(overview.memberships.len(), 1);
        assert_eq!(overview.memberships[0].relation, ChatroomUserRelation::Member);

        let overview = users.relations(&owner);
        assert_eq!(overview.memberships.len(), 2);
        assert!(overview
            .memberships
            .iter()
            .all(|m| m.relation == ChatroomUserRelation::Owner));
    }

    #[tokio::test]
    async fn test_deactivate_user() {
        let ctx = ServiceContext::in_memory(&InMemoryStore::new());
        let users = UserService::new(&ctx);
        let mut owner = users.register_user(register("olivia")).await.unwrap();
        let mut guest = users.register_user(register("gus")).await.unwrap();

        let chatrooms = ChatroomService::new(&ctx);
        let mut lobby = chatrooms.create_chatroom(&mut owner, room("lobby")).await.unwrap();
        let mut den = chatrooms.create_chatroom(&mut owner, room("den")).await.unwrap();
        let membership = MembershipService::new(&ctx);
        membership.join_chatroom(&mut guest, &mut lobby).await.unwrap();
        membership
            .send_member_invitation(&owner, &mut guest, &mut den)
            .await
            .unwrap();

        let err = users.deactivate_user(&mut owner).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::OwnerCannotLeave)));

        users.deactivate_user(&mut guest).await.unwrap();
        assert!(!guest.is_active);
        assert!(!guest.has_chatroom_relations());
        assert!(guest.memberships.is_empty());

        let lobby = chatrooms.find_by_name(&lobby.name).await.unwrap();
        let den = chatrooms.find_by_name(&den.name).await.unwrap();
        assert!(!is_member(&guest, &lobby));
        assert!(!lobby.members.contains(&guest.username));
        assert!(!member_invitation_sent(&guest, &den));
        assert!(den.member_invitees.is_empty());

        let err = users.find_by_username(&guest.username).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::UserNotFound(_))));
        assert!(users.user_exists(&guest.username).await.unwrap());
    }
}
