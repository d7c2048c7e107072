//! Domain errors.

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Repository のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("Session '{0}' already exists")]
    SessionAlreadyExists(String),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),
}

/// MessagePusher のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("Session '{0}' is not registered")]
    SessionNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
