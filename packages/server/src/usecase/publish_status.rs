//! UseCase: ステータス投稿処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PublishStatusUseCase::execute() メソッド
//! - ステータスの保存と、ルーム内の全セッションへの statusUpdate 配信
//!
//! ### なぜこのテストが必要か
//! - 投稿者自身の端末を含め、ルームの全員に同じステータスが届くことを保証
//! - 空の emoji / mood が「なし」として扱われることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：emoji 付きのステータス投稿
//! - エッジケース：空文字の emoji / mood
//! - 異常系：存在しないグループへの投稿

use std::sync::Arc;

use kibun_shared::{
    protocol::{ServerEvent, StatusUpdatePayload},
    time::Clock,
};

use crate::domain::{
    GroupId, MessagePusher, PresenceRepository, StatusEntry, Timestamp, UserId,
};

use super::error::PublishStatusError;

/// 投稿されたステータスの内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInput {
    pub text: String,
    pub emoji: Option<String>,
    pub mood: Option<String>,
}

/// ステータス投稿のユースケース
pub struct PublishStatusUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// Clock（更新時刻の取得）
    clock: Arc<dyn Clock>,
}

impl PublishStatusUseCase {
    /// 新しい PublishStatusUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// ステータス投稿を実行
    ///
    /// # Arguments
    ///
    /// * `user_id` - 投稿者
    /// * `group_id` - 投稿先のグループ
    /// * `input` - ステータスの内容
    ///
    /// # Returns
    ///
    /// * `Ok(StatusEntry)` - 保存されたステータス
    /// * `Err(PublishStatusError)` - 投稿失敗
    pub async fn execute(
        &self,
        user_id: UserId,
        group_id: GroupId,
        input: StatusInput,
    ) -> Result<StatusEntry, PublishStatusError> {
        // 1. 更新時刻を付けてステータスを作成
        let entry = StatusEntry {
            user_id,
            group_id,
            text: input.text,
            emoji: non_empty(input.emoji),
            mood: non_empty(input.mood),
            updated_at: Timestamp::new(self.clock.now_millis()),
        };

        // 2. Repository に保存
        let group = self
            .repository
            .save_status(entry.clone())
            .await
            .map_err(|_| PublishStatusError::GroupNotFound(entry.group_id.to_string()))?;

        // 3. ルーム内の全セッションに statusUpdate をブロードキャスト
        let frame = ServerEvent::StatusUpdate(StatusUpdatePayload::from(&entry))
            .encode()
            .map_err(|e| PublishStatusError::Encode(e.to_string()))?;
        if let Err(e) = self
            .message_pusher
            .broadcast(group.session_ids(), &frame)
            .await
        {
            tracing::warn!("Failed to broadcast statusUpdate for '{}': {}", group.id, e);
        }

        tracing::info!(
            "User '{}' published a status to '{}'",
            entry.user_id,
            entry.group_id
        );
        Ok(entry)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            Group, SessionId, message_pusher::MockMessagePusher,
            repository::MockPresenceRepository,
        },
        usecase::test_support::{Fixture, NOW, drain_events},
    };

    fn input(text: &str, emoji: Option<&str>, mood: Option<&str>) -> StatusInput {
        StatusInput {
            text: text.to_string(),
            emoji: emoji.map(str::to_string),
            mood: mood.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_publish_status_reaches_every_session() {
        // テスト項目: 投稿者自身を含むルームの全セッションに statusUpdate が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = PublishStatusUseCase::new(
            fixture.repository.clone(),
            fixture.message_pusher.clone(),
            fixture.clock.clone(),
        );
        let (_alice, mut alice_rx) = fixture.connect_in("alice", "g1").await;
        let (_bob, mut bob_rx) = fixture.connect_in("bob", "g1").await;
        let (_carol, mut carol_rx) = fixture.connect_in("carol", "g2").await;

        // when (操作):
        let entry = usecase
            .execute(
                UserId::new("alice").unwrap(),
                GroupId::new("g1").unwrap(),
                input("busy", Some("💻"), None),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(entry.updated_at, Timestamp::new(NOW));
        for rx in [&mut alice_rx, &mut bob_rx] {
            let events = drain_events(rx);
            let [ServerEvent::StatusUpdate(payload)] = events.as_slice() else {
                panic!("expected one statusUpdate, got {:?}", events);
            };
            assert_eq!(payload.user_id, "alice");
            assert_eq!(payload.text, "busy");
            assert_eq!(payload.emoji.as_deref(), Some("💻"));
            assert_eq!(
                payload.updated_at.as_deref(),
                Some("2024-01-01T00:00:00.000Z")
            );
        }
        assert!(drain_events(&mut carol_rx).is_empty());
    }

    #[tokio::test]
    async fn test_blank_emoji_and_mood_become_none() {
        // テスト項目: 空文字の emoji / mood は保存されない
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = PublishStatusUseCase::new(
            fixture.repository.clone(),
            fixture.message_pusher.clone(),
            fixture.clock.clone(),
        );
        fixture.connect_in("alice", "g1").await;

        // when (操作):
        let entry = usecase
            .execute(
                UserId::new("alice").unwrap(),
                GroupId::new("g1").unwrap(),
                input("free", Some(""), Some("  ")),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(entry.emoji, None);
        assert_eq!(entry.mood, None);
        let group = fixture
            .repository
            .find_group(&GroupId::new("g1").unwrap())
            .await
            .unwrap();
        assert_eq!(group.statuses.values().next(), Some(&entry));
    }

    #[tokio::test]
    async fn test_publish_to_unknown_group_is_not_broadcast() {
        // テスト項目: 存在しないグループへの投稿はエラーになり、配信されない
        // given (前提条件):
        let fixture = Fixture::new();
        let mut message_pusher = MockMessagePusher::new();
        message_pusher.expect_broadcast().never();
        let usecase = PublishStatusUseCase::new(
            fixture.repository.clone(),
            Arc::new(message_pusher),
            fixture.clock.clone(),
        );

        // when (操作):
        let result = usecase
            .execute(
                UserId::new("alice").unwrap(),
                GroupId::new("ghost").unwrap(),
                input("busy", None, None),
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(PublishStatusError::GroupNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_broadcast_targets_are_group_sessions() {
        // テスト項目: 配信先は保存後のグループのセッション一覧になる
        // given (前提条件):
        let fixture = Fixture::new();
        let group_id = GroupId::new("g1").unwrap();
        let mut group = Group::new(group_id.clone());
        group.join(SessionId::parse("s1").unwrap(), UserId::new("alice").unwrap());
        group.join(SessionId::parse("s2").unwrap(), UserId::new("bob").unwrap());

        let mut repository = MockPresenceRepository::new();
        repository
            .expect_save_status()
            .times(1)
            .returning(move |_| Ok(group.clone()));
        let mut message_pusher = MockMessagePusher::new();
        message_pusher
            .expect_broadcast()
            .withf(|targets, frame| {
                targets.len() == 2 && frame.contains("\"event\":\"statusUpdate\"")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        message_pusher.expect_push_to().never();
        let usecase = PublishStatusUseCase::new(
            Arc::new(repository),
            Arc::new(message_pusher),
            fixture.clock.clone(),
        );

        // when (操作):
        let result = usecase
            .execute(
                UserId::new("alice").unwrap(),
                group_id,
                input("busy", None, None),
            )
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
