//! UseCase errors.

use thiserror::Error;

use crate::domain::RepositoryError;

/// セッション接続のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Session '{0}' already exists")]
    DuplicateSession(String),
}

/// ルーム参加・退出のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

impl From<RepositoryError> for RoomError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::SessionNotFound(id) | RepositoryError::SessionAlreadyExists(id) => {
                RoomError::SessionNotFound(id)
            }
            RepositoryError::GroupNotFound(id) => RoomError::GroupNotFound(id),
        }
    }
}

/// セッション切断・強制切断のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session '{0}' not found")]
    NotFound(String),
}

/// ステータス投稿のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishStatusError {
    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// グループ名変更のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenameGroupError {
    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Group name must not be empty")]
    EmptyName,

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// グループ取得のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GetGroupError {
    #[error("Group '{0}' not found")]
    GroupNotFound(String),
}
