//! Value objects of the relay server.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValueObjectError;

/// Upper bound for user and group identifiers
pub const MAX_ID_LENGTH: usize = 128;

fn validate_id(field: &'static str, value: &str) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(ValueObjectError::TooLong {
            field,
            max: MAX_ID_LENGTH,
        });
    }
    Ok(())
}

/// ユーザー ID
///
/// 開発サーバーでは bearer トークンがそのままユーザー ID になります。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let value = value.into();
        validate_id("user id", &value)?;
        Ok(Self(value))
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

/// グループ ID（ルーム名としても使われる）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let value = value.into();
        validate_id("group id", &value)?;
        Ok(Self(value))
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

/// セッション ID
///
/// 接続（WebSocket / long-polling）ごとにサーバーが採番します。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// 新しいセッション ID を UUID v4 で生成
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// クライアントから受け取った文字列をセッション ID として扱う
    pub fn parse(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValueObjectError::Empty("session id"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in milliseconds (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
