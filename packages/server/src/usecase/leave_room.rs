//! UseCase: ルーム退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 退出後の memberUpdate が残りの参加者にだけ届くこと
//!
//! ### なぜこのテストが必要か
//! - 退出したクライアントにはそのルームの配信が届かなくなることを保証
//! - 残りの参加者のメンバー一覧が更新されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人のルームから 1 人が退出
//! - 異常系：存在しないルームからの退出

use std::sync::Arc;

use kibun_shared::protocol::{MemberUpdatePayload, ServerEvent};

use crate::domain::{Group, GroupId, MessagePusher, PresenceRepository, SessionId};

use super::error::RoomError;

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ルーム退出を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Group)` - 退出後のグループ
    /// * `Err(RoomError)` - 退出失敗
    pub async fn execute(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RoomError> {
        // 1. Repository 経由でルームから退出
        let group = self.repository.leave_room(session_id, group_id).await?;
        tracing::info!("Session '{}' left room '{}'", session_id, group_id);

        // 2. 残りの参加者に memberUpdate をブロードキャスト
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

        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{Fixture, drain_events};

    #[tokio::test]
    async fn test_leave_room_notifies_remaining_members() {
        // テスト項目: 退出すると残りの参加者にだけ memberUpdate が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase =
            LeaveRoomUseCase::new(fixture.repository.clone(), fixture.message_pusher.clone());
        let (alice, mut alice_rx) = fixture.connect_in("alice", "g1").await;
        let (_bob, mut bob_rx) = fixture.connect_in("bob", "g1").await;

        // when (操作):
        let group = usecase
            .execute(&alice, &GroupId::new("g1").unwrap())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(group.member_count(), 1);
        assert!(drain_events(&mut alice_rx).is_empty());
        let bob_events = drain_events(&mut bob_rx);
        let [ServerEvent::MemberUpdate(payload)] = bob_events.as_slice() else {
            panic!("expected one memberUpdate, got {:?}", bob_events);
        };
        assert_eq!(payload.members.len(), 1);
        assert_eq!(payload.members[0].user_id, "bob");

        let session = fixture.repository.find_session(&alice).await.unwrap();
        assert!(session.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_leave_unknown_room() {
        // テスト項目: 存在しないルームからの退出はエラーになる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase =
            LeaveRoomUseCase::new(fixture.repository.clone(), fixture.message_pusher.clone());
        let (alice, _alice_rx) = fixture.connect("alice").await;

        // when (操作):
        let result = usecase.execute(&alice, &GroupId::new("g9").unwrap()).await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::GroupNotFound("g9".to_string())));
    }
}
