//! Inbound event dispatcher.
//!
//! Turns server-pushed frames into mutations of the group store. Malformed
//! input never fails the caller: it is logged and dropped.

use std::sync::Arc;

use kibun_shared::{
    protocol::{
        GroupUpdatePayload, MemberUpdatePayload, ProtocolError, ServerEvent, StatusUpdatePayload,
    },
    time::{Clock, parse_rfc3339_millis},
};

use crate::{
    model::{GroupId, Member, ModelError, StatusRecord, UserId, non_empty},
    store::GroupStore,
};

/// What happened to one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was applied with this many store mutations
    Applied { mutations: usize },
    /// Valid but not state-bearing (unknown or informational event)
    Ignored,
    /// Malformed; nothing was applied
    Dropped,
}

/// Routes inbound events to the store
pub struct EventDispatcher {
    store: Arc<dyn GroupStore>,
    clock: Arc<dyn Clock>,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn GroupStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Decode one text frame and apply it
    pub async fn dispatch(&self, text: &str) -> DispatchOutcome {
        match ServerEvent::decode(text) {
            Ok(event) => self.apply(event).await,
            Err(ProtocolError::UnknownEvent(name)) => {
                tracing::debug!("Ignoring unknown event '{}'", name);
                DispatchOutcome::Ignored
            }
            Err(e @ ProtocolError::InvalidFrame(_)) => {
                tracing::warn!("Ignoring frame that is not a protocol frame: {}", e);
                DispatchOutcome::Ignored
            }
            Err(e) => {
                tracing::warn!("Dropping event: {}", e);
                DispatchOutcome::Dropped
            }
        }
    }

    /// Apply an already decoded event
    pub async fn apply(&self, event: ServerEvent) -> DispatchOutcome {
        match event {
            ServerEvent::StatusUpdate(payload) => self.on_status_update(payload).await,
            ServerEvent::MemberUpdate(payload) => self.on_member_update(payload).await,
            ServerEvent::GroupUpdate(payload) => on_group_update(&payload),
            ServerEvent::Connect(payload) => {
                tracing::debug!("Ignoring late handshake frame (sid '{}')", payload.sid);
                DispatchOutcome::Ignored
            }
        }
    }

    async fn on_status_update(&self, payload: StatusUpdatePayload) -> DispatchOutcome {
        let record = match self.status_record(payload) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Dropping statusUpdate: {}", e);
                return DispatchOutcome::Dropped;
            }
        };

        let group_id = record.group_id.clone();
        let mood = record.mood_record();
        self.store.update_group_status(&group_id, record).await;

        match mood {
            Some(mood) => {
                self.store.update_group_mood(&group_id, mood).await;
                DispatchOutcome::Applied { mutations: 2 }
            }
            None => DispatchOutcome::Applied { mutations: 1 },
        }
    }

    fn status_record(&self, payload: StatusUpdatePayload) -> Result<StatusRecord, ModelError> {
        let updated_at = payload
            .updated_at
            .as_deref()
            .and_then(parse_rfc3339_millis)
            .unwrap_or_else(|| self.clock.now_millis());

        Ok(StatusRecord {
            user_id: UserId::new(payload.user_id)?,
            group_id: GroupId::new(payload.group_id)?,
            text: payload.text,
            emoji: non_empty(payload.emoji),
            mood: non_empty(payload.mood),
            updated_at,
        })
    }

    async fn on_member_update(&self, payload: MemberUpdatePayload) -> DispatchOutcome {
        let group_id = match GroupId::new(payload.group_id) {
            Ok(group_id) => group_id,
            Err(e) => {
                tracing::warn!("Dropping memberUpdate: {}", e);
                return DispatchOutcome::Dropped;
            }
        };

        let received = payload.members.len();
        let members: Vec<Member> = payload
            .members
            .into_iter()
            .filter_map(|member| match Member::try_from(member) {
                Ok(member) => Some(member),
                Err(e) => {
                    tracing::warn!("Skipping member of '{}': {}", group_id, e);
                    None
                }
            })
            .collect();

        // Nothing usable left of a non-empty list
        if members.is_empty() && received > 0 {
            tracing::warn!("Dropping memberUpdate for '{}': no valid members", group_id);
            return DispatchOutcome::Dropped;
        }

        self.store.update_group_members(&group_id, members).await;
        DispatchOutcome::Applied { mutations: 1 }
    }
}

fn on_group_update(payload: &GroupUpdatePayload) -> DispatchOutcome {
    tracing::info!(
        "Group '{}' updated (name: {})",
        payload.group_id.as_deref().unwrap_or("?"),
        payload.name.as_deref().unwrap_or("-")
    );
    DispatchOutcome::Ignored
}

#[cfg(test)]
mod tests {
    use kibun_shared::time::FixedClock;
    use mockall::predicate::eq;

    use super::*;
    use crate::store::{InMemoryGroupStore, MockGroupStore};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - statusUpdate → status の upsert（mood があれば mood も）
    // - memberUpdate → メンバーリストの置き換え
    // - 不正なペイロードは捨てられ、ストアは変更されない
    //
    // 【どのようなシナリオをテストするか】
    // 1. u1/g1/busy（emoji 空）→ emoji は None、mood は作られない
    // 2. mood 付き → status と mood の 2 件
    // 3. 到着順で後勝ち（updatedAt は比較しない）
    // ========================================

    const NOW: i64 = 1_700_000_000_000;

    fn dispatcher_with(store: Arc<dyn GroupStore>) -> EventDispatcher {
        EventDispatcher::new(store, Arc::new(FixedClock::new(NOW)))
    }

    fn group(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_status_without_mood_upserts_status_only() {
        // テスト項目: mood のない statusUpdate では status のみ更新され、空の emoji は None になる
        // given (前提条件):
        let mut store = MockGroupStore::new();
        store
            .expect_update_group_status()
            .withf(|group_id, record| {
                group_id.as_str() == "g1"
                    && record.user_id.as_str() == "u1"
                    && record.text == "busy"
                    && record.emoji.is_none()
                    && record.mood.is_none()
                    && record.updated_at == 1_704_067_200_000
            })
            .times(1)
            .return_const(());
        store.expect_update_group_mood().never();
        let dispatcher = dispatcher_with(Arc::new(store));
        let frame = r#"{"event":"statusUpdate","data":{"userId":"u1","groupId":"g1","text":"busy","emoji":"","updatedAt":"2024-01-01T00:00:00Z"}}"#;

        // when (操作):
        let outcome = dispatcher.dispatch(frame).await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Applied { mutations: 1 });
    }

    #[tokio::test]
    async fn test_status_with_mood_upserts_status_and_mood() {
        // テスト項目: mood 付きの statusUpdate では status と mood の両方が更新される
        // given (前提条件):
        let mut store = MockGroupStore::new();
        store
            .expect_update_group_status()
            .times(1)
            .return_const(());
        store
            .expect_update_group_mood()
            .withf(|group_id, record| {
                group_id.as_str() == "g1"
                    && record.mood == "happy"
                    && record.text == "lunch"
                    && record.emoji.as_deref() == Some("🍜")
            })
            .times(1)
            .return_const(());
        let dispatcher = dispatcher_with(Arc::new(store));
        let frame = r#"{"event":"statusUpdate","data":{"userId":"u1","groupId":"g1","text":"lunch","emoji":"🍜","mood":"happy","updatedAt":"2024-01-01T00:00:00Z"}}"#;

        // when (操作):
        let outcome = dispatcher.dispatch(frame).await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Applied { mutations: 2 });
    }

    #[tokio::test]
    async fn test_missing_updated_at_uses_clock() {
        // テスト項目: updatedAt がない・不正な場合は受信時刻が使われる
        // given (前提条件):
        let store = Arc::new(InMemoryGroupStore::new());
        let dispatcher = dispatcher_with(store.clone());

        // when (操作):
        dispatcher
            .dispatch(r#"{"event":"statusUpdate","data":{"userId":"u1","groupId":"g1","text":"a"}}"#)
            .await;
        dispatcher
            .dispatch(r#"{"event":"statusUpdate","data":{"userId":"u2","groupId":"g1","text":"b","updatedAt":"yesterday"}}"#)
            .await;

        // then (期待する結果):
        let g1 = group("g1");
        assert_eq!(store.status_of(&g1, &user("u1")).await.unwrap().updated_at, NOW);
        assert_eq!(store.status_of(&g1, &user("u2")).await.unwrap().updated_at, NOW);
    }

    #[tokio::test]
    async fn test_last_write_wins_by_arrival_order() {
        // テスト項目: updatedAt に関係なく後から届いた更新が残る
        // given (前提条件):
        let store = Arc::new(InMemoryGroupStore::new());
        let dispatcher = dispatcher_with(store.clone());
        let newer = r#"{"event":"statusUpdate","data":{"userId":"u1","groupId":"g1","text":"A","updatedAt":"2024-06-01T00:00:00Z"}}"#;
        let older = r#"{"event":"statusUpdate","data":{"userId":"u1","groupId":"g1","text":"B","updatedAt":"2024-01-01T00:00:00Z"}}"#;

        // when (操作):
        dispatcher.dispatch(newer).await;
        dispatcher.dispatch(older).await;

        // then (期待する結果):
        let record = store.status_of(&group("g1"), &user("u1")).await.unwrap();
        assert_eq!(record.text, "B");
    }

    #[tokio::test]
    async fn test_member_update_replaces_list() {
        // テスト項目: memberUpdate はメンバーリストを丸ごと置き換える
        // given (前提条件):
        let mut store = MockGroupStore::new();
        store
            .expect_update_group_members()
            .with(
                eq(group("g1")),
                eq(vec![Member {
                    user_id: user("c"),
                    display_name: Some("Carol".to_string()),
                    avatar: None,
                }]),
            )
            .times(1)
            .return_const(());
        let dispatcher = dispatcher_with(Arc::new(store));
        let frame = r#"{"event":"memberUpdate","data":{"groupId":"g1","members":[{"userId":"c","displayName":"Carol"}]}}"#;

        // when (操作):
        let outcome = dispatcher.dispatch(frame).await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Applied { mutations: 1 });
    }

    #[tokio::test]
    async fn test_invalid_member_entries_are_skipped() {
        // テスト項目: userId が空のメンバーだけが除かれ、残りのメンバーで置き換えられる
        // given (前提条件):
        let mut store = MockGroupStore::new();
        store
            .expect_update_group_members()
            .with(
                eq(group("g1")),
                eq(vec![Member::new(user("a")), Member::new(user("b"))]),
            )
            .times(1)
            .return_const(());
        let dispatcher = dispatcher_with(Arc::new(store));
        let frame = r#"{"event":"memberUpdate","data":{"groupId":"g1","members":[{"userId":"a"},{"userId":""},{"userId":"b"}]}}"#;

        // when (操作):
        let outcome = dispatcher.dispatch(frame).await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Applied { mutations: 1 });
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_dropped() {
        // テスト項目: userId/groupId が欠けている・空のペイロードはストアに触れずに捨てられる
        // given (前提条件):
        let mut store = MockGroupStore::new();
        store.expect_update_group_status().never();
        store.expect_update_group_members().never();
        let dispatcher = dispatcher_with(Arc::new(store));
        let frames = [
            r#"{"event":"statusUpdate","data":{"groupId":"g1","text":"x"}}"#,
            r#"{"event":"statusUpdate","data":{"userId":"","groupId":"g1"}}"#,
            r#"{"event":"statusUpdate","data":"oops"}"#,
            r#"{"event":"memberUpdate","data":{"groupId":" ","members":[]}}"#,
            r#"{"event":"memberUpdate","data":{"groupId":"g1","members":[{"userId":""}]}}"#,
        ];

        // when (操作) / then (期待する結果):
        for frame in frames {
            assert_eq!(dispatcher.dispatch(frame).await, DispatchOutcome::Dropped, "{frame}");
        }
    }

    #[tokio::test]
    async fn test_unknown_and_informational_events_are_ignored() {
        // テスト項目: 未知のイベント・groupUpdate・JSON でないフレームは無視される
        // given (前提条件):
        let store = MockGroupStore::new();
        let dispatcher = dispatcher_with(Arc::new(store));

        // when (操作) / then (期待する結果):
        for frame in [
            r#"{"event":"typing","data":{}}"#,
            r#"{"event":"groupUpdate","data":{"groupId":"g1","name":"Team"}}"#,
            "not json",
        ] {
            assert_eq!(dispatcher.dispatch(frame).await, DispatchOutcome::Ignored);
        }
    }
}
