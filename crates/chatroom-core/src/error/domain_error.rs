//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{ChatroomName, TagName, Username};

/// Broad classification of a [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The requested transition does not apply to the current state
    Precondition,
    /// The acting user lacks the rights for the operation
    Authorization,
    /// A referenced entity or record does not exist
    Lookup,
    /// Input failed a format rule
    Validation,
    /// Storage or other infrastructure failure
    Infrastructure,
}

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Precondition Errors
    // =========================================================================
    #[error("User is already a member of this chatroom")]
    AlreadyMember,

    #[error("User is already an administrator of this chatroom")]
    AlreadyAdmin,

    #[error("A chatroom invitation is already pending for this user")]
    InvitePending,

    #[error("An admin invitation is already pending for this user")]
    AdminInvitePending,

    #[error("No pending invitation for this user")]
    NoInvite,

    #[error("User is not a member of this chatroom")]
    NotMember,

    #[error("User is not an administrator of this chatroom")]
    NotAdmin,

    #[error("The chatroom owner cannot leave or step down")]
    OwnerCannotLeave,

    #[error("Cannot invite yourself")]
    CannotInviteSelf,

    #[error("Chatroom name already taken: {0}")]
    ChatroomNameTaken(ChatroomName),

    #[error("Username already taken: {0}")]
    UsernameTaken(Username),

    #[error("Chatroom already has tag: {0}")]
    TagAlreadyPresent(TagName),

    #[error("Cannot send a friend request to yourself")]
    CannotBefriendSelf,

    #[error("A friend request is already pending")]
    FriendRequestPending,

    #[error("Users are already friends")]
    AlreadyFriends,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Chatroom is invite only")]
    UnauthorizedJoin,

    #[error("No admin invitation to accept")]
    UnauthorizedAdminAccept,

    #[error("Insufficient privileges")]
    InsufficientPrivileges,

    #[error("Not chatroom owner")]
    NotChatroomOwner,

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("Membership not found")]
    MembershipNotFound,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Chatroom not found: {0}")]
    ChatroomNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Users are not friends")]
    NotFriends,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid {kind}: {reason}")]
    InvalidName { kind: &'static str, reason: String },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Relations were modified concurrently")]
    ConcurrentModification,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn invalid_name(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            kind,
            reason: reason.into(),
        }
    }

    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Precondition
            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::AlreadyAdmin => "ALREADY_ADMIN",
            Self::InvitePending => "INVITE_PENDING",
            Self::AdminInvitePending => "ADMIN_INVITE_PENDING",
            Self::NoInvite => "NO_INVITE",
            Self::NotMember => "NOT_MEMBER",
            Self::NotAdmin => "NOT_ADMIN",
            Self::OwnerCannotLeave => "OWNER_CANNOT_LEAVE",
            Self::CannotInviteSelf => "CANNOT_INVITE_SELF",
            Self::ChatroomNameTaken(_) => "CHATROOM_NAME_TAKEN",
            Self::UsernameTaken(_) => "USERNAME_TAKEN",
            Self::TagAlreadyPresent(_) => "TAG_ALREADY_PRESENT",
            Self::CannotBefriendSelf => "CANNOT_BEFRIEND_SELF",
            Self::FriendRequestPending => "FRIEND_REQUEST_PENDING",
            Self::AlreadyFriends => "ALREADY_FRIENDS",

            // Authorization
            Self::UnauthorizedJoin => "UNAUTHORIZED_JOIN",
            Self::UnauthorizedAdminAccept => "UNAUTHORIZED_ADMIN_ACCEPT",
            Self::InsufficientPrivileges => "INSUFFICIENT_PRIVILEGES",
            Self::NotChatroomOwner => "NOT_CHATROOM_OWNER",

            // Lookup
            Self::MembershipNotFound => "UNKNOWN_MEMBERSHIP",
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::ChatroomNotFound(_) => "UNKNOWN_CHATROOM",
            Self::TagNotFound(_) => "UNKNOWN_TAG",
            Self::NotFriends => "NOT_FRIENDS",

            // Validation
            Self::InvalidName { .. } => "INVALID_NAME",

            // Infrastructure
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyMember
            | Self::AlreadyAdmin
            | Self::InvitePending
            | Self::AdminInvitePending
            | Self::NoInvite
            | Self::NotMember
            | Self::NotAdmin
            | Self::OwnerCannotLeave
            | Self::CannotInviteSelf
            | Self::ChatroomNameTaken(_)
            | Self::UsernameTaken(_)
            | Self::TagAlreadyPresent(_)
            | Self::CannotBefriendSelf
            | Self::FriendRequestPending
            | Self::AlreadyFriends => ErrorCategory::Precondition,

            Self::UnauthorizedJoin
            | Self::UnauthorizedAdminAccept
            | Self::InsufficientPrivileges
            | Self::NotChatroomOwner => ErrorCategory::Authorization,

            Self::MembershipNotFound
            | Self::UserNotFound(_)
            | Self::ChatroomNotFound(_)
            | Self::TagNotFound(_)
            | Self::NotFriends => ErrorCategory::Lookup,

            Self::InvalidName { .. } => ErrorCategory::Validation,

            Self::ConcurrentModification | Self::DatabaseError(_) | Self::InternalError(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::Lookup
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    /// Check if the operation was rejected because of the current relation state
    pub fn is_precondition(&self) -> bool {
        self.category() == ErrorCategory::Precondition
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Check if this error came from storage rather than from a domain rule
    pub fn is_infrastructure(&self) -> bool {
        self.category() == ErrorCategory::Infrastructure
    }
}
