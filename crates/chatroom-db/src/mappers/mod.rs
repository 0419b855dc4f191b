//! Entity to model mappers
//!
//! Conversions between domain entities (chatroom-core) and database models.
//! Names coming back from the database are re-validated; a row that fails
//! validation surfaces as a database error rather than a validation error.

mod chatroom;
mod user;

pub use chatroom::{chatroom_from_model, ChatroomUpdate};
pub use user::{membership_from_model, user_from_model};
pub(crate) use user::username_set;

use chatroom_core::error::DomainError;
use chatroom_core::membership::RelationStore;
use chatroom_core::traits::RepoResult;
use chatroom_core::value_objects::{ChatroomName, RelationKind, Relations, TagName, Username};

use crate::models::RelationModel;

fn corrupt(err: DomainError) -> DomainError {
    DomainError::DatabaseError(format!("corrupt row: {err}"))
}

pub(crate) fn decode_username(raw: String) -> RepoResult<Username> {
    Username::parse(raw).map_err(corrupt)
}

pub(crate) fn decode_chatroom_name(raw: String) -> RepoResult<ChatroomName> {
    ChatroomName::parse(raw).map_err(corrupt)
}

pub(crate) fn decode_tag(raw: String) -> RepoResult<TagName> {
    TagName::parse(raw).map_err(corrupt)
}

pub(crate) fn decode_kind(raw: &str) -> RepoResult<RelationKind> {
    raw.parse().map_err(corrupt)
}

/// Load relation rows into an arena for projection onto an aggregate
pub(crate) fn relation_store(rows: Vec<RelationModel>) -> RepoResult<RelationStore> {
    let mut store = RelationStore::new();
    for row in rows {
        let kind = decode_kind(&row.kind)?;
        let username = decode_username(row.username)?;
        let chatroom = decode_chatroom_name(row.chatroom_name)?;
        store.insert(&username, kind, &chatroom);
    }
    Ok(store)
}

/// Storage names of the relation kinds kept in `chatroom_relations`
pub(crate) fn stored_kinds(relations: Relations) -> Vec<String> {
    (relations & Relations::MUTABLE)
        .kinds()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

/// Pair state as stored: relation rows plus ownership from the chatroom row
pub(crate) fn stored_pair_state(kinds: &[String], is_owner: bool) -> RepoResult<Relations> {
    let mut relations = Relations::empty();
    for raw in kinds {
        relations |= decode_kind(raw)?.flag();
    }
    if is_owner {
        relations |= Relations::OWNER;
    }
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_kinds_skip_owner() {
        let kinds = stored_kinds(Relations::OWNER | Relations::MEMBER | Relations::ADMIN);
        assert_eq!(kinds, vec!["member".to_string(), "admin".to_string()]);
    }

    #[test]
    fn test_stored_pair_state() {
        let kinds = vec!["member".to_string(), "admin_invite".to_string()];
        assert_eq!(
            stored_pair_state(&kinds, false).unwrap(),
            Relations::MEMBER | Relations::ADMIN_INVITE
        );
        assert!(stored_pair_state(&kinds, true)
            .unwrap()
            .contains(Relations::OWNER));
        assert!(stored_pair_state(&["bogus".to_string()], false).is_err());
    }

    #[test]
    fn test_corrupt_names_are_database_errors() {
        let err = decode_username("not valid!".to_string()).unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_relation_store_from_rows() {
        let rows = vec![RelationModel {
            username: "alice".to_string(),
            chatroom_name: "lobby".to_string(),
            kind: "member_invite".to_string(),
        }];
        let store = relation_store(rows).unwrap();
        assert_eq!(store.len(), 1);
    }
}
