//! mpsc チャンネルを使った MessagePusher 実装
//!
//! ## 責務
//!
//! - セッションごとの `PusherChannel` を管理
//! - セッションへのフレーム送信（push_to, broadcast）と終了通知（close）
//!
//! ## 設計ノート
//!
//! チャンネルの生成と受信側の処理は UI 層で行われます。
//! - WebSocket: 受信側をソケットの送信タスク（pusher_loop）が読み出す
//! - long-polling: 受信側をポーリングリクエストが読み出す
//!
//! この実装は生成された `PusherChannel` を受け取り、送信にのみ使用します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePushError, MessagePusher, Outgoing, PusherChannel, SessionId};

/// mpsc チャンネルを使った MessagePusher 実装
#[derive(Default)]
pub struct ChannelMessagePusher {
    /// 接続中のセッションの sender
    sessions: Mutex<HashMap<SessionId, PusherChannel>>,
}

impl ChannelMessagePusher {
    /// 新しい ChannelMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }

    async fn send(&self, session_id: &SessionId, outgoing: Outgoing) -> Result<(), MessagePushError> {
        let sessions = self.sessions.lock().await;
        let sender = sessions
            .get(session_id)
            .ok_or_else(|| MessagePushError::SessionNotFound(session_id.to_string()))?;
        sender
            .send(outgoing)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for ChannelMessagePusher {
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel) {
        let mut sessions = self.sessions.lock().await;
        tracing::debug!("Session '{}' registered to MessagePusher", session_id);
        sessions.insert(session_id, sender);
    }

    async fn unregister_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
        tracing::debug!("Session '{}' unregistered from MessagePusher", session_id);
    }

    async fn push_to(&self, session_id: &SessionId, frame: &str) -> Result<(), MessagePushError> {
        self.send(session_id, Outgoing::Frame(frame.to_string()))
            .await?;
        tracing::debug!("Pushed frame to session '{}'", session_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<SessionId>,
        frame: &str,
    ) -> Result<(), MessagePushError> {
        let sessions = self.sessions.lock().await;

        for target in targets {
            if let Some(sender) = sessions.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(Outgoing::Frame(frame.to_string())) {
                    tracing::warn!("Failed to push frame to session '{}': {}", target, e);
                } else {
                    tracing::debug!("Broadcasted frame to session '{}'", target);
                }
            } else {
                tracing::warn!("Session '{}' not found during broadcast, skipping", target);
            }
        }

        Ok(())
    }

    async fn close(&self, session_id: &SessionId) -> Result<(), MessagePushError> {
        self.send(session_id, Outgoing::Close).await?;
        tracing::debug!("Requested close of session '{}'", session_id);
        Ok(())
    }
}
