//! Identity names - usernames, chatroom names and tag names
//!
//! Users and chatrooms are identified by their unique names, so equality of
//! these newtypes is the identity comparison used throughout the domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Maximum length of a username or chatroom name
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length of a tag name
pub const MAX_TAG_LENGTH: usize = 32;

/// Letters accepted in identifiers besides ASCII alphanumerics
const EXTRA_LETTERS: &str = "ÁáÉéðÐþÞæÆóÓöÖ";

/// Check an identifier against the "no symbols" rule shared by users and chatrooms
fn validate_identifier(kind: &'static str, raw: &str) -> Result<(), DomainError> {
    if raw.is_empty() {
        return Err(DomainError::invalid_name(kind, "must not be empty"));
    }
    if raw.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::invalid_name(
            kind,
            format!("must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !EXTRA_LETTERS.contains(*c))
    {
        return Err(DomainError::invalid_name(
            kind,
            format!("contains invalid character '{bad}'"),
        ));
    }
    Ok(())
}

/// Unique name of a user account
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Parse and validate a username
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        validate_identifier("username", &raw)?;
        Ok(Self(raw))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique name of a chatroom
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatroomName(String);

impl ChatroomName {
    /// Parse and validate a chatroom name
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        validate_identifier("chatroom name", &raw)?;
        Ok(Self(raw))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a chatroom tag, normalized to trimmed lowercase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Parse, trim and lowercase a tag name
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::invalid_name("tag", "must not be empty"));
        }
        if normalized.chars().count() > MAX_TAG_LENGTH {
            return Err(DomainError::invalid_name(
                "tag",
                format!("must be at most {MAX_TAG_LENGTH} characters"),
            ));
        }
        Ok(Self(normalized))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_name_conversions {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }

            impl FromStr for $name {
                type Err = DomainError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::parse(s)
                }
            }

            impl TryFrom<String> for $name {
                type Error = DomainError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::parse(value)
                }
            }

            impl From<$name> for String {
                fn from(name: $name) -> Self {
                    name.0
                }
            }
        )*
    };
}

impl_name_conversions!(Username, ChatroomName, TagName);
