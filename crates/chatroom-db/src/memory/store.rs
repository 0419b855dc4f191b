//! In-memory implementation of the repository traits
//!
//! Relations live in a single [`RelationStore`] arena guarded by one
//! `parking_lot::RwLock`; aggregates handed out are projections of it. The
//! optimistic pair check behaves exactly like the Postgres adapter's.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use chatroom_core::entities::{Chatroom, Membership, User};
use chatroom_core::error::DomainError;
use chatroom_core::friendship::friend_links;
use chatroom_core::membership::{relations_between, RelationStore};
use chatroom_core::traits::{ChatroomRepository, RepoResult, TagRepository, UserRepository};
use chatroom_core::value_objects::{
    ChatroomName, FriendLinks, RelationKind, Relations, TagName, Username,
};

type Pair = (Username, Username);

#[derive(Debug, Default)]
struct State {
    /// Profiles only; relation sets are projected on read
    users: BTreeMap<Username, User>,
    /// Metadata and tags only; relation sets are projected on read
    chatrooms: BTreeMap<ChatroomName, Chatroom>,
    relations: RelationStore,
    memberships: BTreeMap<(Username, ChatroomName), Membership>,
    /// Smaller name first
    friendships: BTreeSet<Pair>,
    /// (requestor, requestee)
    friend_requests: BTreeSet<Pair>,
    tags: BTreeSet<TagName>,
}

fn ordered(a: &Username, b: &Username) -> Pair {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Copy of an aggregate with every relation stripped, as kept in the maps
fn bare_user(user: &User) -> User {
    let mut bare = User::new(user.username.clone(), user.display_name.clone());
    bare.created_at = user.created_at;
    bare.is_active = user.is_active;
    bare
}

fn bare_chatroom(chatroom: &Chatroom) -> Chatroom {
    let mut bare = Chatroom::new(
        chatroom.name.clone(),
        chatroom.display_name.clone(),
        chatroom.description.clone(),
        chatroom.listed,
        chatroom.invite_only,
        chatroom.owner.clone(),
    );
    bare.created_at = chatroom.created_at;
    bare.last_message_received = chatroom.last_message_received;
    bare.tags = chatroom.tags.clone();
    bare
}

impl State {
    fn project_user(&self, stored: &User) -> User {
        let mut user = stored.clone();
        let name = user.username.clone();
        self.relations.project_user(&mut user);

        user.memberships = self
            .memberships
            .values()
            .filter(|m| m.username == name)
            .cloned()
            .collect();
        user.memberships.sort_by_key(|m| m.when_joined);

        user.friends = self
            .friendships
            .iter()
            .filter_map(|(a, b)| {
                if a == &name {
                    Some(b.clone())
                } else if b == &name {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect();
        user.friend_requestees = self
            .friend_requests
            .iter()
            .filter(|(requestor, _)| requestor == &name)
            .map(|(_, requestee)| requestee.clone())
            .collect();
        user.friend_requestors = self
            .friend_requests
            .iter()
            .filter(|(_, requestee)| requestee == &name)
            .map(|(requestor, _)| requestor.clone())
            .collect();
        user
    }

    fn project_chatroom(&self, stored: &Chatroom) -> Chatroom {
        let mut chatroom = stored.clone();
        self.relations.project_chatroom(&mut chatroom);
        chatroom
    }

    fn stored_friend_links(&self, first: &Username, second: &Username) -> FriendLinks {
        let mut links = FriendLinks::empty();
        links.set(
            FriendLinks::FRIENDS,
            self.friendships.contains(&ordered(first, second)),
        );
        links.set(
            FriendLinks::FIRST_REQUESTED,
            self.friend_requests
                .contains(&(first.clone(), second.clone())),
        );
        links.set(
            FriendLinks::SECOND_REQUESTED,
            self.friend_requests
                .contains(&(second.clone(), first.clone())),
        );
        links
    }

    /// Active users only
    fn require_user(&self, username: &Username) -> RepoResult<()> {
        if self.users.get(username).is_some_and(|u| u.is_active) {
            Ok(())
        } else {
            Err(DomainError::UserNotFound(username.to_string()))
        }
    }

    fn require_chatroom(&self, name: &ChatroomName) -> RepoResult<()> {
        if self.chatrooms.contains_key(name) {
            Ok(())
        } else {
            Err(DomainError::ChatroomNotFound(name.to_string()))
        }
    }

    /// Store the pair's relations and membership as the aggregates have them
    fn write_pair(&mut self, user: &User, chatroom: &Chatroom) {
        let owner = self.relations.pair(&user.username, &chatroom.name) & Relations::OWNER;
        let desired = relations_between(user, chatroom) & Relations::MUTABLE;
        self.relations
            .replace_pair(&user.username, &chatroom.name, desired | owner);

        let key = (user.username.clone(), chatroom.name.clone());
        match user.membership(&chatroom.name) {
            Some(membership) => {
                self.memberships.insert(key, membership.clone());
            }
            None => {
                self.memberships.remove(&key);
            }
        }
    }
}

/// In-memory repository backend sharing one state across clones
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored relation triples
    pub fn relation_count(&self) -> usize {
        self.state.read().relations.len()
    }

    /// Number of stored membership records
    pub fn membership_count(&self) -> usize {
        self.state.read().memberships.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &Username) -> RepoResult<Option<User>> {
        let state = self.state.read();
        Ok(state
            .users
            .get(username)
            .map(|stored| state.project_user(stored)))
    }

    async fn username_exists(&self, username: &Username) -> RepoResult<bool> {
        Ok(self.state.read().users.contains_key(username))
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.users.contains_key(&user.username) {
            return Err(DomainError::UsernameTaken(user.username.clone()));
        }
        state.users.insert(user.username.clone(), bare_user(user));
        Ok(())
    }

    async fn save(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write();
        let stored = state
            .users
            .get_mut(&user.username)
            .ok_or_else(|| DomainError::UserNotFound(user.username.to_string()))?;
        stored.display_name.clone_from(&user.display_name);

        for membership in &user.memberships {
            let key = (user.username.clone(), membership.chatroom_name.clone());
            if let Some(stored) = state.memberships.get_mut(&key) {
                stored.last_read = membership.last_read;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, first, second), fields(first = %first.username, second = %second.username))]
    async fn save_friendship(
        &self,
        first: &User,
        second: &User,
        expected: FriendLinks,
    ) -> RepoResult<()> {
        let mut state = self.state.write();
        state.require_user(&first.username)?;
        state.require_user(&second.username)?;

        let (a, b) = (&first.username, &second.username);
        if state.stored_friend_links(a, b) != expected {
            return Err(DomainError::ConcurrentModification);
        }

        let desired = friend_links(first, second);
        let pair = ordered(a, b);
        if desired.contains(FriendLinks::FRIENDS) {
            state.friendships.insert(pair);
        } else {
            state.friendships.remove(&pair);
        }
        for (flag, request) in [
            (FriendLinks::FIRST_REQUESTED, (a.clone(), b.clone())),
            (FriendLinks::SECOND_REQUESTED, (b.clone(), a.clone())),
        ] {
            if desired.contains(flag) {
                state.friend_requests.insert(request);
            } else {
                state.friend_requests.remove(&request);
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, username: &Username) -> RepoResult<()> {
        let mut state = self.state.write();
        if !state.users.contains_key(username) {
            return Err(DomainError::UserNotFound(username.to_string()));
        }
        if !state
            .relations
            .chatrooms_of(username, RelationKind::Owner)
            .is_empty()
        {
            return Err(DomainError::OwnerCannotLeave);
        }

        if let Some(stored) = state.users.get_mut(username) {
            stored.is_active = false;
        }
        let removed = state.relations.remove_user(username);
        debug!(removed, "relations removed");

        state.memberships.retain(|(u, _), _| u != username);
        state.friendships.retain(|(a, b)| a != username && b != username);
        state
            .friend_requests
            .retain(|(a, b)| a != username && b != username);
        Ok(())
    }
}

#[async_trait]
impl ChatroomRepository for InMemoryStore {
    async fn find_by_name(&self, name: &ChatroomName) -> RepoResult<Option<Chatroom>> {
        let state = self.state.read();
        Ok(state
            .chatrooms
            .get(name)
            .map(|stored| state.project_chatroom(stored)))
    }

    async fn name_exists(&self, name: &ChatroomName) -> RepoResult<bool> {
        Ok(self.state.read().chatrooms.contains_key(name))
    }

    async fn find_all(&self) -> RepoResult<Vec<Chatroom>> {
        let state = self.state.read();
        Ok(state
            .chatrooms
            .values()
            .map(|stored| state.project_chatroom(stored))
            .collect())
    }

    async fn find_listed(&self) -> RepoResult<Vec<Chatroom>> {
        let state = self.state.read();
        Ok(state
            .chatrooms
            .values()
            .filter(|c| c.listed)
            .map(|stored| state.project_chatroom(stored))
            .collect())
    }

    async fn find_listed_with_tag(&self, tag: &TagName) -> RepoResult<Vec<Chatroom>> {
        let state = self.state.read();
        Ok(state
            .chatrooms
            .values()
            .filter(|c| c.listed && c.has_tag(tag))
            .map(|stored| state.project_chatroom(stored))
            .collect())
    }

    #[instrument(skip(self, chatroom, owner), fields(chatroom = %chatroom.name, owner = %owner.username))]
    async fn create(&self, chatroom: &Chatroom, owner: &User) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.chatrooms.contains_key(&chatroom.name) {
            return Err(DomainError::ChatroomNameTaken(chatroom.name.clone()));
        }
        state.require_user(&owner.username)?;

        state
            .chatrooms
            .insert(chatroom.name.clone(), bare_chatroom(chatroom));
        state.tags.extend(chatroom.tags.iter().cloned());

        let relations = relations_between(owner, chatroom);
        state
            .relations
            .replace_pair(&owner.username, &chatroom.name, relations);
        if let Some(membership) = owner.membership(&chatroom.name) {
            state.memberships.insert(
                (owner.username.clone(), chatroom.name.clone()),
                membership.clone(),
            );
        }
        Ok(())
    }

    async fn save(&self, chatroom: &Chatroom) -> RepoResult<()> {
        let mut state = self.state.write();
        let stored = state
            .chatrooms
            .get_mut(&chatroom.name)
            .ok_or_else(|| DomainError::ChatroomNotFound(chatroom.name.to_string()))?;

        stored.display_name.clone_from(&chatroom.display_name);
        stored.description.clone_from(&chatroom.description);
        stored.listed = chatroom.listed;
        stored.invite_only = chatroom.invite_only;
        stored.last_message_received = chatroom.last_message_received;
        Ok(())
    }

    #[instrument(skip(self, chatroom), fields(chatroom = %chatroom.name))]
    async fn save_details(&self, chatroom: &Chatroom) -> RepoResult<()> {
        let mut state = self.state.write();
        let stored = state
            .chatrooms
            .get_mut(&chatroom.name)
            .ok_or_else(|| DomainError::ChatroomNotFound(chatroom.name.to_string()))?;

        stored.display_name.clone_from(&chatroom.display_name);
        stored.description.clone_from(&chatroom.description);
        stored.listed = chatroom.listed;
        stored.invite_only = chatroom.invite_only;
        stored.last_message_received = chatroom.last_message_received;
        stored.tags.clone_from(&chatroom.tags);
        state.tags.extend(chatroom.tags.iter().cloned());
        Ok(())
    }

    #[instrument(skip(self, user, chatroom), fields(username = %user.username, chatroom = %chatroom.name))]
    async fn save_relations(
        &self,
        user: &User,
        chatroom: &Chatroom,
        expected: Relations,
    ) -> RepoResult<()> {
        let mut state = self.state.write();
        state.require_user(&user.username)?;
        state.require_chatroom(&chatroom.name)?;

        let stored = state.relations.pair(&user.username, &chatroom.name);
        if stored != expected {
            debug!(%stored, %expected, "stored pair state differs");
            return Err(DomainError::ConcurrentModification);
        }

        state.write_pair(user, chatroom);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &ChatroomName) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.chatrooms.remove(name).is_none() {
            return Err(DomainError::ChatroomNotFound(name.to_string()));
        }
        state.relations.remove_chatroom(name);
        state.memberships.retain(|(_, c), _| c != name);
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn exists(&self, tag: &TagName) -> RepoResult<bool> {
        Ok(self.state.read().tags.contains(tag))
    }

    async fn set_chatroom_tags(
        &self,
        chatroom: &ChatroomName,
        tags: &BTreeSet<TagName>,
    ) -> RepoResult<()> {
        let mut state = self.state.write();
        let stored = state
            .chatrooms
            .get_mut(chatroom)
            .ok_or_else(|| DomainError::ChatroomNotFound(chatroom.to_string()))?;
        stored.tags.clone_from(tags);
        state.tags.extend(tags.iter().cloned());
        Ok(())
    }

    async fn delete_unused(&self) -> RepoResult<u64> {
        let mut state = self.state.write();
        let used: BTreeSet<TagName> = state
            .chatrooms
            .values()
            .flat_map(|c| c.tags.iter().cloned())
            .collect();
        let before = state.tags.len();
        state.tags.retain(|tag| used.contains(tag));
        Ok((before - state.tags.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatroom_core::friendship::add_friend;
    use chatroom_core::membership::{establish_owner, join_chatroom, send_member_invitation};
    use chrono::Utc;

    fn username(raw: &str) -> Username {
        Username::parse(raw).unwrap()
    }

    async fn seeded() -> (InMemoryStore, User, User, Chatroom) {
        let store = InMemoryStore::new();
        let mut owner = User::new(username("olivia"), "Olivia");
        let guest = User::new(username("gus"), "Gus");
        UserRepository::create(&store, &owner).await.unwrap();
        UserRepository::create(&store, &guest).await.unwrap();

        let mut room = Chatroom::new(
            ChatroomName::parse("rust").unwrap(),
            "Rust",
            "All things Rust",
            true,
            false,
            owner.username.clone(),
        );
        establish_owner(&mut owner, &mut room, Utc::now()).unwrap();
        ChatroomRepository::create(&store, &room, &owner).await.unwrap();
        (store, owner, guest, room)
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryStore>();
    }

    #[tokio::test]
    async fn test_create_projects_owner_relations() {
        let (store, owner, _, room) = seeded().await;

        let loaded = store.find_by_name(&room.name).await.unwrap().unwrap();
        assert!(loaded.members.contains(&owner.username));
        assert!(loaded.administrators.contains(&owner.username));

        let owner = store.find_by_username(&owner.username).await.unwrap().unwrap();
        assert!(owner.owned_chatrooms.contains(&room.name));
        assert!(owner.membership(&room.name).is_some());
        assert_eq!(store.membership_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let (store, owner, _, room) = seeded().await;

        let err = ChatroomRepository::create(&store, &room, &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ChatroomNameTaken(_)));

        let err = UserRepository::create(&store, &owner).await.unwrap_err();
        assert!(matches!(err, DomainError::UsernameTaken(_)));
    }

    #[tokio::test]
    async fn test_save_relations_checks_expected_state() {
        let (store, _, mut guest, mut room) = seeded().await;
        let expected = relations_between(&guest, &room);

        join_chatroom(&mut guest, &mut room, Utc::now()).unwrap();
        store.save_relations(&guest, &room, expected).await.unwrap();
        assert_eq!(store.membership_count(), 2);

        // Replaying the same change against the stale expectation must fail
        let err = store
            .save_relations(&guest, &room, expected)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification));

        let loaded = store.find_by_username(&guest.username).await.unwrap().unwrap();
        assert!(loaded.member_of_chatrooms.contains(&room.name));
    }

    #[tokio::test]
    async fn test_save_relations_never_touches_ownership() {
        let (store, mut owner, _, room) = seeded().await;
        let expected = relations_between(&owner, &room);

        owner.owned_chatrooms.clear();
        store.save_relations(&owner, &room, expected).await.unwrap();

        let loaded = store.find_by_name(&room.name).await.unwrap().unwrap();
        let owner = store.find_by_username(&owner.username).await.unwrap().unwrap();
        assert!(owner.owned_chatrooms.contains(&loaded.name));
    }

    #[tokio::test]
    async fn test_delete_chatroom_clears_relations() {
        let (store, _, mut guest, mut room) = seeded().await;
        let expected = relations_between(&guest, &room);
        send_member_invitation(&mut guest, &mut room, Utc::now()).unwrap();
        store.save_relations(&guest, &room, expected).await.unwrap();

        store.delete(&room.name).await.unwrap();

        assert_eq!(store.relation_count(), 0);
        assert_eq!(store.membership_count(), 0);
        let guest = store.find_by_username(&guest.username).await.unwrap().unwrap();
        assert!(!guest.has_chatroom_relations());
        assert!(matches!(
            store.delete(&room.name).await,
            Err(DomainError::ChatroomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_friendship_round_trip() {
        let (store, mut owner, mut guest, _) = seeded().await;

        let expected = friend_links(&owner, &guest);
        add_friend(&mut owner, &mut guest).unwrap();
        store
            .save_friendship(&owner, &guest, expected)
            .await
            .unwrap();

        let expected = friend_links(&guest, &owner);
        add_friend(&mut guest, &mut owner).unwrap();
        store
            .save_friendship(&guest, &owner, expected)
            .await
            .unwrap();

        let owner = store.find_by_username(&owner.username).await.unwrap().unwrap();
        assert!(owner.friends.contains(&guest.username));
        assert!(owner.friend_requestees.is_empty());
        assert!(owner.friend_requestors.is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_refuses_owners() {
        let (store, owner, mut guest, mut room) = seeded().await;
        let expected = relations_between(&guest, &room);
        join_chatroom(&mut guest, &mut room, Utc::now()).unwrap();
        store.save_relations(&guest, &room, expected).await.unwrap();

        store.deactivate(&guest.username).await.unwrap();
        let err = store.deactivate(&owner.username).await.unwrap_err();
        assert!(matches!(err, DomainError::OwnerCannotLeave));

        let guest = store.find_by_username(&guest.username).await.unwrap().unwrap();
        assert!(!guest.is_active);
        assert!(!guest.has_chatroom_relations());

        let owner = store.find_by_username(&owner.username).await.unwrap().unwrap();
        assert!(owner.is_active);
        assert!(owner.owned_chatrooms.contains(&room.name));
        assert!(owner.member_of_chatrooms.contains(&room.name));
        assert!(owner.membership(&room.name).is_some());
        assert_eq!(store.membership_count(), 1);
    }

    #[tokio::test]
    async fn test_inactive_users_cannot_change_relations() {
        let (store, mut owner, guest, mut room) = seeded().await;
        store.deactivate(&guest.username).await.unwrap();

        let mut held = guest.clone();
        let expected = relations_between(&held, &room);
        join_chatroom(&mut held, &mut room, Utc::now()).unwrap();
        let err = store
            .save_relations(&held, &room, expected)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound(_)));

        let mut held = guest.clone();
        let expected = friend_links(&owner, &held);
        add_friend(&mut owner, &mut held).unwrap();
        let err = store
            .save_friendship(&owner, &held, expected)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound(_)));

        let room = store.find_by_name(&room.name).await.unwrap().unwrap();
        assert!(!room.members.contains(&guest.username));
        assert_eq!(store.membership_count(), 1);
    }

    #[tokio::test]
    async fn test_save_details_writes_metadata_and_tags() {
        let (store, _, _, mut room) = seeded().await;
        let tag = TagName::parse("async").unwrap();
        room.display_name = "Rust Lang".to_string();
        room.invite_only = true;
        room.tags = BTreeSet::from([tag.clone()]);

        store.save_details(&room).await.unwrap();

        let loaded = store.find_by_name(&room.name).await.unwrap().unwrap();
        assert_eq!(loaded.display_name, "Rust Lang");
        assert!(loaded.invite_only);
        assert_eq!(loaded.tags, room.tags);
        assert!(store.exists(&tag).await.unwrap());
    }

    #[tokio::test]
    async fn test_listed_tag_queries_and_unused_tags() {
        let (store, _, _, room) = seeded().await;
        let tag = TagName::parse("systems").unwrap();

        store
            .set_chatroom_tags(&room.name, &BTreeSet::from([tag.clone()]))
            .await
            .unwrap();
        assert!(store.exists(&tag).await.unwrap());
        assert_eq!(store.find_listed_with_tag(&tag).await.unwrap().len(), 1);

        store
            .set_chatroom_tags(&room.name, &BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(store.delete_unused().await.unwrap(), 1);
        assert!(!store.exists(&tag).await.unwrap());
    }
}
