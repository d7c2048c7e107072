//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! このモジュールは `MessagePusher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `channel`: セッションごとの mpsc チャンネルを使った実装
//!   （WebSocket / long-polling の両方で共通）

pub mod channel;

pub use channel::ChannelMessagePusher;
