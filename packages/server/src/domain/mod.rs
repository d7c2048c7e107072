//! Domain layer
//!
//! ビジネスルールとインターフェース（Repository / MessagePusher）を定義します。
//! 他の層には依存しません。

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Group, Session, StatusEntry};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use message_pusher::{MessagePusher, Outgoing, PusherChannel};
pub use repository::PresenceRepository;
pub use value_object::{GroupId, SessionId, Timestamp, UserId};
