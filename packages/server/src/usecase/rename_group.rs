//! UseCase: グループ名変更処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RenameGroupUseCase::execute() メソッド
//! - グループ名の保存と groupUpdate の配信
//!
//! ### なぜこのテストが必要か
//! - groupUpdate はクライアントが受け取るイベントの 1 つであり、開発サーバーから発生させる手段が必要
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者のいるグループの名前変更
//! - 異常系：空の名前、存在しないグループ

use std::sync::Arc;

use kibun_shared::protocol::{GroupUpdatePayload, ServerEvent};

use crate::domain::{Group, GroupId, MessagePusher, PresenceRepository};

use super::error::RenameGroupError;

/// グループ名変更のユースケース
pub struct RenameGroupUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl RenameGroupUseCase {
    /// 新しい RenameGroupUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// グループ名変更を実行
    pub async fn execute(
        &self,
        group_id: &GroupId,
        name: &str,
    ) -> Result<Group, RenameGroupError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RenameGroupError::EmptyName);
        }

        let group = self
            .repository
            .rename_group(group_id, name.to_string())
            .await
            .map_err(|_| RenameGroupError::GroupNotFound(group_id.to_string()))?;

        let frame = ServerEvent::GroupUpdate(GroupUpdatePayload::from(&group))
            .encode()
            .map_err(|e| RenameGroupError::Encode(e.to_string()))?;
        if let Err(e) = self
            .message_pusher
            .broadcast(group.session_ids(), &frame)
            .await
        {
            tracing::warn!("Failed to broadcast groupUpdate for '{}': {}", group_id, e);
        }

        tracing::info!("Group '{}' renamed to '{}'", group_id, name);
        Ok(group)
    }
}
