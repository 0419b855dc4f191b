//! Chatroom entity <-> model mapper

use chatroom_core::entities::Chatroom;
use chatroom_core::traits::RepoResult;

use crate::models::ChatroomModel;

use super::{decode_chatroom_name, decode_username};

/// Convert a chatrooms row into a Chatroom without tags or relations
pub fn chatroom_from_model(model: ChatroomModel) -> RepoResult<Chatroom> {
    let mut chatroom = Chatroom::new(
        decode_chatroom_name(model.name)?,
        model.display_name,
        model.description,
        model.listed,
        model.invite_only,
        decode_username(model.owner)?,
    );
    chatroom.created_at = model.created_at;
    chatroom.last_message_received = model.last_message_received;
    Ok(chatroom)
}

/// Values written by a chatroom metadata update
pub struct ChatroomUpdate<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub description: &'a str,
    pub listed: bool,
    pub invite_only: bool,
    pub last_message_received: chrono::DateTime<chrono::Utc>,
}

impl<'a> ChatroomUpdate<'a> {
    pub fn new(chatroom: &'a Chatroom) -> Self {
        Self {
            name: chatroom.name.as_str(),
            display_name: &chatroom.display_name,
            description: &chatroom.description,
            listed: chatroom.listed,
            invite_only: chatroom.invite_only,
            last_message_received: chatroom.last_message_received,
        }
    }
}
