//! End-to-end membership flows
//!
//! Each scenario runs against the in-memory store and, when DATABASE_URL is
//! set, against PostgreSQL as well.
//!
//! Run with: cargo test -p integration-tests --test membership_flows

use chatroom_core::error::DomainError;
use chatroom_core::membership::{
    admin_invitation_sent, is_admin, is_member, is_owner, member_invitation_sent,
};
use chatroom_core::{ChatroomUserRelation, FriendRequestOutcome, Relations};
use chatroom_service::{
    ChatroomService, FriendService, MembershipService, ServiceError, TagService, UserService,
};
use integration_tests::{chatroom_request, user_request, TestApp};

fn domain(err: ServiceError) -> DomainError {
    match err {
        ServiceError::Domain(e) => e,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

// ============================================================================
// Membership Scenarios
// ============================================================================

#[tokio::test]
async fn test_invite_only_join_flow() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let mut room = app
            .create_chatroom(&mut owner, chatroom_request("private", true))
            .await
            .unwrap();
        let service = MembershipService::new(&app.ctx);

        let err = service.join_chatroom(&mut guest, &mut room).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::UnauthorizedJoin), "[{}]", app.backend);

        service
            .send_member_invitation(&owner, &mut guest, &mut room)
            .await
            .unwrap();
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        service.join_chatroom(&mut guest, &mut room).await.unwrap();
        assert!(is_member(&guest, &room));
        assert!(!member_invitation_sent(&guest, &room));
        assert_eq!(guest.memberships.len(), 1);
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        let stored = app.reload_user(&guest).await.unwrap();
        assert_eq!(stored.memberships.len(), 1, "[{}]", app.backend);
    }
}

#[tokio::test]
async fn test_admin_invite_reject_cascade() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let mut room = app
            .create_chatroom(&mut owner, chatroom_request("cascade", false))
            .await
            .unwrap();
        let service = MembershipService::new(&app.ctx);

        service
            .send_admin_invitation(&owner, &mut guest, &mut room)
            .await
            .unwrap();
        assert!(member_invitation_sent(&guest, &room));
        assert!(admin_invitation_sent(&guest, &room));
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        service
            .reject_chatroom_invitation(&mut guest, &mut room)
            .await
            .unwrap();
        assert!(!member_invitation_sent(&guest, &room));
        assert!(!admin_invitation_sent(&guest, &room));
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        let err = service
            .reject_admin_invitation(&mut guest, &mut room)
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::NoInvite), "[{}]", app.backend);
    }
}

#[tokio::test]
async fn test_admin_lifecycle() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let mut other = app.register(user_request("other")).await.unwrap();
        let mut room = app
            .create_chatroom(&mut owner, chatroom_request("admins", true))
            .await
            .unwrap();
        let service = MembershipService::new(&app.ctx);

        service
            .send_admin_invitation(&owner, &mut guest, &mut room)
            .await
            .unwrap();
        service.accept_admin_invite(&mut guest, &mut room).await.unwrap();
        assert!(is_admin(&guest, &room));
        assert!(is_member(&guest, &room));
        assert_eq!(service.relation(&guest, &room), ChatroomUserRelation::Admin);
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        // Admins may invite members but not administrators
        service
            .send_member_invitation(&guest, &mut other, &mut room)
            .await
            .unwrap();
        let err = service
            .send_admin_invitation(&guest, &mut other, &mut room)
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InsufficientPrivileges));

        service.quit_admin(&mut guest, &mut room).await.unwrap();
        assert!(!is_admin(&guest, &room));
        assert!(is_member(&guest, &room));
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        service.leave_chatroom(&mut guest, &mut room).await.unwrap();
        assert!(guest.memberships.is_empty());
        app.assert_pair_persisted(&guest, &room).await.unwrap();

        let err = service.leave_chatroom(&mut owner, &mut room).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::OwnerCannotLeave));
        assert!(is_owner(&owner, &room));
        assert_eq!(
            relations_of_owner(&app, &owner, &room).await,
            Relations::OWNER | Relations::ADMIN | Relations::MEMBER
        );
    }
}

async fn relations_of_owner(
    app: &TestApp,
    owner: &chatroom_core::User,
    room: &chatroom_core::Chatroom,
) -> Relations {
    let owner = app.reload_user(owner).await.unwrap();
    let room = app.reload_chatroom(room).await.unwrap();
    chatroom_core::membership::relations_between(&owner, &room)
}

#[tokio::test]
async fn test_concurrent_writers_conflict() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let room = app
            .create_chatroom(&mut owner, chatroom_request("race", false))
            .await
            .unwrap();
        let service = MembershipService::new(&app.ctx);

        // Two requests working from the same snapshot
        let (mut user_a, mut room_a) = (guest.clone(), room.clone());
        let (mut user_b, mut room_b) = (guest.clone(), room.clone());

        service.join_chatroom(&mut user_a, &mut room_a).await.unwrap();
        let err = service
            .join_chatroom(&mut user_b, &mut room_b)
            .await
            .unwrap_err();
        assert!(
            matches!(domain(err), DomainError::ConcurrentModification),
            "[{}]",
            app.backend
        );
        assert_eq!(user_b, guest);

        guest = app.reload_user(&guest).await.unwrap();
        assert_eq!(guest.memberships.len(), 1, "[{}]", app.backend);
    }
}

// ============================================================================
// Chatroom, Tag, Friend and User Scenarios
// ============================================================================

#[tokio::test]
async fn test_chatroom_deletion_cleans_up() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let mut request = chatroom_request("doomed", false);
        request.tags = vec![format!("t{}", integration_tests::unique_suffix())];
        let tag = request.tags[0].clone();
        let mut room = app.create_chatroom(&mut owner, request).await.unwrap();

        MembershipService::new(&app.ctx)
            .join_chatroom(&mut guest, &mut room)
            .await
            .unwrap();
        let tags = TagService::new(&app.ctx);
        assert_eq!(tags.find_listed_chatrooms_with_tag(&tag).await.unwrap().len(), 1);

        let chatrooms = ChatroomService::new(&app.ctx);
        chatrooms.delete_chatroom(&owner, &room).await.unwrap();

        assert!(!chatrooms.chatroom_exists(&room.name).await.unwrap());
        assert!(tags.find_listed_chatrooms_with_tag(&tag).await.unwrap().is_empty());
        let guest = app.reload_user(&guest).await.unwrap();
        assert!(guest.memberships.is_empty(), "[{}]", app.backend);
        assert!(!guest.has_chatroom_relations(), "[{}]", app.backend);
    }
}

#[tokio::test]
async fn test_friends_and_deactivation() {
    for app in TestApp::all().await.expect("backend setup failed") {
        let mut owner = app.register(user_request("owner")).await.unwrap();
        let mut guest = app.register(user_request("guest")).await.unwrap();
        let mut room = app
            .create_chatroom(&mut owner, chatroom_request("social", false))
            .await
            .unwrap();
        let mut later = app
            .create_chatroom(&mut owner, chatroom_request("later", false))
            .await
            .unwrap();

        let friends = FriendService::new(&app.ctx);
        assert_eq!(
            friends.add_friend(&mut guest, &mut owner).await.unwrap(),
            FriendRequestOutcome::Requested
        );
        assert_eq!(
            friends.add_friend(&mut owner, &mut guest).await.unwrap(),
            FriendRequestOutcome::Befriended
        );
        MembershipService::new(&app.ctx)
            .join_chatroom(&mut guest, &mut room)
            .await
            .unwrap();

        let users = UserService::new(&app.ctx);
        let overview = serde_json::to_value(users.relations(&guest)).unwrap();
        assert_eq!(overview["friends"][0], owner.username.as_str());
        assert_eq!(overview["memberships"][0]["relation"], "MEMBER");

        let mut held = guest.clone();
        users.deactivate_user(&mut guest).await.unwrap();
        assert!(!guest.is_active);
        assert!(guest.friends.is_empty());

        let err = MembershipService::new(&app.ctx)
            .join_chatroom(&mut held, &mut later)
            .await
            .unwrap_err();
        assert!(
            matches!(domain(err), DomainError::UserNotFound(_)),
            "[{}]",
            app.backend
        );
        let err = users.deactivate_user(&mut owner).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::OwnerCannotLeave));

        let owner = app.reload_user(&owner).await.unwrap();
        assert!(owner.friends.is_empty(), "[{}]", app.backend);
        let room = app.reload_chatroom(&room).await.unwrap();
        assert!(!room.members.contains(&guest.username), "[{}]", app.backend);
    }
}
