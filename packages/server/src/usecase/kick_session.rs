//! UseCase: セッションの強制切断
//!
//! サーバー側からセッションを終了させます（クライアントの再接続処理の確認用）。
//! セッションの削除自体は、トランスポートが閉じた後に UI 層が
//! DisconnectSessionUseCase を呼び出して行います。

use std::sync::Arc;

use crate::domain::{MessagePusher, SessionId};

use super::error::SessionError;

/// セッション強制切断のユースケース
pub struct KickSessionUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl KickSessionUseCase {
    /// 新しい KickSessionUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    pub async fn execute(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.message_pusher
            .close(session_id)
            .await
            .map_err(|_| SessionError::NotFound(session_id.to_string()))?;
        tracing::info!("Session '{}' kicked by the server", session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessagePushError, Outgoing, message_pusher::MockMessagePusher},
        usecase::test_support::Fixture,
    };

    #[tokio::test]
    async fn test_kick_sends_close() {
        // テスト項目: 強制切断でセッションに終了通知が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = KickSessionUseCase::new(fixture.message_pusher.clone());
        let (alice, mut alice_rx) = fixture.connect("alice").await;

        // when (操作):
        let result = usecase.execute(&alice).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(alice_rx.try_recv().ok(), Some(Outgoing::Close));
    }

    #[tokio::test]
    async fn test_kick_unknown_session() {
        // テスト項目: 存在しないセッションの強制切断はエラーになる
        // given (前提条件):
        let mut message_pusher = MockMessagePusher::new();
        message_pusher
            .expect_close()
            .times(1)
            .returning(|id| Err(MessagePushError::SessionNotFound(id.to_string())));
        let usecase = KickSessionUseCase::new(Arc::new(message_pusher));

        // when (操作):
        let result = usecase.execute(&SessionId::parse("ghost").unwrap()).await;

        // then (期待する結果):
        assert_eq!(result, Err(SessionError::NotFound("ghost".to_string())));
    }
}
