//! MessagePusher trait 定義
//!
//! セッションへのフレーム送信（通知）のインターフェース。
//! WebSocket / long-polling のどちらのトランスポートでも、UI 層が作った
//! `PusherChannel` を登録することで同じように送信できます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessagePushError, SessionId};

/// セッションに送る内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// JSON テキストフレーム
    Frame(String),
    /// サーバー側からセッションを終了する
    Close,
}

/// セッションへの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<Outgoing>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// セッションの送信チャンネルを登録
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel);

    /// セッションの送信チャンネルを登録解除
    async fn unregister_session(&self, session_id: &SessionId);

    /// 特定のセッションにフレームを送信
    async fn push_to(&self, session_id: &SessionId, frame: &str) -> Result<(), MessagePushError>;

    /// 複数のセッションにフレームを送信（一部の失敗は許容）
    async fn broadcast(
        &self,
        targets: Vec<SessionId>,
        frame: &str,
    ) -> Result<(), MessagePushError>;

    /// セッションにサーバー側からの終了を通知
    async fn close(&self, session_id: &SessionId) -> Result<(), MessagePushError>;
}
