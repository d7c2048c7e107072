//! Infrastructure layer
//!
//! ドメイン層の trait（Repository / MessagePusher）の具体的な実装と、
//! ドメインモデルからワイヤーフォーマットへの変換を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
