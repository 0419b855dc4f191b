//! Arena of user/chatroom relation triples
//!
//! Each relation is stored once as a `(user, kind, chatroom)` triple and both
//! aggregate views are projected from it, so the user side and the chatroom
//! side cannot drift apart.

use std::collections::BTreeSet;

use crate::entities::{Chatroom, User};
use crate::value_objects::{ChatroomName, RelationKind, Relations, Username};

type UserKey = (Username, RelationKind, ChatroomName);
type ChatroomKey = (ChatroomName, RelationKind, Username);

/// Triple store with one index per direction
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    by_user: BTreeSet<UserKey>,
    by_chatroom: BTreeSet<ChatroomKey>,
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    pub fn contains(&self, user: &Username, kind: RelationKind, chatroom: &ChatroomName) -> bool {
        self.by_user
            .contains(&(user.clone(), kind, chatroom.clone()))
    }

    /// Returns `true` if the triple was not present
    pub fn insert(&mut self, user: &Username, kind: RelationKind, chatroom: &ChatroomName) -> bool {
        self.by_chatroom
            .insert((chatroom.clone(), kind, user.clone()));
        self.by_user.insert((user.clone(), kind, chatroom.clone()))
    }

    /// Returns `true` if the triple was present
    pub fn remove(&mut self, user: &Username, kind: RelationKind, chatroom: &ChatroomName) -> bool {
        self.by_chatroom
            .remove(&(chatroom.clone(), kind, user.clone()));
        self.by_user.remove(&(user.clone(), kind, chatroom.clone()))
    }

    /// Relation flags stored for the pair
    pub fn pair(&self, user: &Username, chatroom: &ChatroomName) -> Relations {
        Relations::from_kinds(
            RelationKind::ALL
                .into_iter()
                .filter(|&kind| self.contains(user, kind, chatroom)),
        )
    }

    /// Overwrite the stored relations of one pair
    pub fn replace_pair(&mut self, user: &Username, chatroom: &ChatroomName, relations: Relations) {
        for kind in RelationKind::ALL {
            if relations.contains(kind.flag()) {
                self.insert(user, kind, chatroom);
            } else {
                self.remove(user, kind, chatroom);
            }
        }
    }

    /// Chatrooms the user holds `kind` with
    pub fn chatrooms_of(&self, user: &Username, kind: RelationKind) -> BTreeSet<ChatroomName> {
        self.by_user
            .iter()
            .filter(|(u, k, _)| u == user && *k == kind)
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    /// Users holding `kind` with the chatroom
    pub fn users_of(&self, chatroom: &ChatroomName, kind: RelationKind) -> BTreeSet<Username> {
        self.by_chatroom
            .iter()
            .filter(|(c, k, _)| c == chatroom && *k == kind)
            .map(|(_, _, u)| u.clone())
            .collect()
    }

    /// Drop every relation of a user, returning the number removed
    pub fn remove_user(&mut self, user: &Username) -> usize {
        let doomed: Vec<UserKey> = self
            .by_user
            .iter()
            .filter(|(u, _, _)| u == user)
            .cloned()
            .collect();
        for (u, k, c) in &doomed {
            self.remove(u, *k, c);
        }
        doomed.len()
    }

    /// Drop every relation of a chatroom, returning the number removed
    pub fn remove_chatroom(&mut self, chatroom: &ChatroomName) -> usize {
        let doomed: Vec<ChatroomKey> = self
            .by_chatroom
            .iter()
            .filter(|(c, _, _)| c == chatroom)
            .cloned()
            .collect();
        for (c, k, u) in &doomed {
            self.remove(u, *k, c);
        }
        doomed.len()
    }

    /// Fill the user's chatroom relation sets from the store
    pub fn project_user(&self, user: &mut User) {
        for kind in RelationKind::ALL {
            *user.chatrooms_mut(kind) = self.chatrooms_of(&user.username, kind);
        }
    }

    /// Fill the chatroom's user relation sets from the store
    pub fn project_chatroom(&self, chatroom: &mut Chatroom) {
        for kind in RelationKind::ALL {
            let users = self.users_of(&chatroom.name, kind);
            if let Some(set) = chatroom.users_mut(kind) {
                *set = users;
            }
        }
    }
}
