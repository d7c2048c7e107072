//! UseCase: セッション切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectSessionUseCase::execute() メソッド
//! - セッションの削除、MessagePusher の登録解除、参加中だったルームへの通知
//!
//! ### なぜこのテストが必要か
//! - 切断したセッションがメンバー一覧に残らないことを保証
//! - 同じユーザーの別セッションが残っている場合はメンバーのままであることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加中のセッションの切断
//! - エッジケース：同じユーザーが別セッションでも参加している
//! - 異常系：既に切断済みのセッション

use std::sync::Arc;

use kibun_shared::protocol::{MemberUpdatePayload, ServerEvent};

use crate::domain::{MessagePusher, PresenceRepository, Session, SessionId};

use super::error::SessionError;

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectSessionUseCase {
    /// 新しい DisconnectSessionUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// セッション切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - 削除されたセッション（`rooms` は切断前に参加していたルーム）
    /// * `Err(SessionError)` - セッションが存在しない
    pub async fn execute(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        // 1. Repository 経由でセッションを削除（参加中のルームからも退出）
        let session = self
            .repository
            .remove_session(session_id)
            .await
            .map_err(|_| SessionError::NotFound(session_id.to_string()))?;

        // 2. MessagePusher から登録解除
        self.message_pusher.unregister_session(session_id).await;

        // 3. 参加していたルームの残りの参加者に memberUpdate をブロードキャスト
        for group_id in &session.rooms {
            let Some(group) = self.repository.find_group(group_id).await else {
                continue;
            };
            match ServerEvent::MemberUpdate(MemberUpdatePayload::from(&group)).encode() {
                Ok(frame) => {
                    if let Err(e) = self
                        .message_pusher
                        .broadcast(group.session_ids(), &frame)
                        .await
                    {
                        tracing::warn!(
                            "Failed to broadcast memberUpdate for '{}': {}",
                            group_id,
                            e
                        );
                    }
                }
                Err(e) => tracing::warn!("Failed to encode memberUpdate: {}", e),
            }
        }

        tracing::info!(
            "Session '{}' of user '{}' disconnected",
            session.id,
            session.user_id
        );
        Ok(session)
    }
}
