//! Value objects and records held by the group store.

use std::fmt;

use kibun_shared::protocol::MemberPayload;
use thiserror::Error;

const MAX_ID_LENGTH: usize = 128;

/// Validation errors for value objects
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{kind} is too long ({length} characters)")]
    TooLong { kind: &'static str, length: usize },
}

fn validate_id(kind: &'static str, value: String) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::Empty(kind));
    }
    let length = trimmed.chars().count();
    if length > MAX_ID_LENGTH {
        return Err(ModelError::TooLong { kind, length });
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Group identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        validate_id("GroupId", value.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GroupId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        validate_id("UserId", value.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Latest known status of one user within one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub text: String,
    pub emoji: Option<String>,
    pub mood: Option<String>,
    /// Unix milliseconds (UTC)
    pub updated_at: i64,
}

impl StatusRecord {
    /// Mood record derived from this status, if a mood is attached
    pub fn mood_record(&self) -> Option<MoodRecord> {
        self.mood.as_ref().map(|mood| MoodRecord {
            user_id: self.user_id.clone(),
            group_id: self.group_id.clone(),
            mood: mood.clone(),
            text: self.text.clone(),
            emoji: self.emoji.clone(),
            updated_at: self.updated_at,
        })
    }
}

/// Latest known mood of one user within one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodRecord {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub mood: String,
    pub text: String,
    pub emoji: Option<String>,
    pub updated_at: i64,
}

/// Group member descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

impl Member {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            avatar: None,
        }
    }

    /// Name shown to users, falling back to the user id
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.user_id.as_str())
    }
}

impl TryFrom<MemberPayload> for Member {
    type Error = ModelError;

    fn try_from(payload: MemberPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(payload.user_id)?,
            display_name: non_empty(payload.display_name),
            avatar: non_empty(payload.avatar),
        })
    }
}

/// Collapse empty or whitespace-only strings into `None`
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
