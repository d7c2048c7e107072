//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - ルーム参加後の memberUpdate の配信と、保存済みステータスの送信
//!
//! ### なぜこのテストが必要か
//! - 参加したクライアントがすぐにグループの現在の状態を表示できることを保証
//! - 既存の参加者にメンバーの変化が伝わることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：空のルームへの参加
//! - 正常系：ステータスが保存済みのルームへの参加
//! - 異常系：存在しないセッションからの参加

use std::sync::Arc;

use kibun_shared::protocol::{MemberUpdatePayload, ServerEvent, StatusUpdatePayload};

use crate::domain::{Group, GroupId, MessagePusher, PresenceRepository, SessionId};

use super::error::RoomError;

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ルーム参加を実行
    ///
    /// # Arguments
    ///
    /// * `session_id` - 参加するセッション
    /// * `group_id` - 参加するルーム（グループ）
    ///
    /// # Returns
    ///
    /// * `Ok(Group)` - 参加後のグループ
    /// * `Err(RoomError)` - 参加失敗
    pub async fn execute(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RoomError> {
        // 1. Repository 経由でルームに参加
        let group = self.repository.join_room(session_id, group_id).await?;
        tracing::info!("Session '{}' joined room '{}'", session_id, group_id);

        // 2. ルーム内の全セッション（参加者自身を含む）に memberUpdate をブロードキャスト
        let frame = ServerEvent::MemberUpdate(MemberUpdatePayload::from(&group))
            .encode()
            .map_err(|e| RoomError::Encode(e.to_string()))?;
        if let Err(e) = self
            .message_pusher
            .broadcast(group.session_ids(), &frame)
            .await
        {
            tracing::warn!("Failed to broadcast memberUpdate for '{}': {}", group_id, e);
        }

        // 3. 参加者に保存済みのステータスを送信
        for entry in group.statuses.values() {
            let frame = ServerEvent::StatusUpdate(StatusUpdatePayload::from(entry))
                .encode()
                .map_err(|e| RoomError::Encode(e.to_string()))?;
            if let Err(e) = self.message_pusher.push_to(session_id, &frame).await {
                tracing::warn!("Failed to replay status to '{}': {}", session_id, e);
                break;
            }
        }

        Ok(group)
    }
}
