//! Room membership tracker.
//!
//! Joins and leaves the server-side room of a group. A join requested while
//! disconnected is queued and replayed exactly once on the next connect; a
//! leave requested while disconnected is dropped.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use kibun_shared::protocol::ClientEvent;

use crate::{connection::ConnectionManager, error::ClientError, model::GroupId};

/// Where room requests are sent
#[cfg_attr(test, mockall::automock)]
pub trait OutboundChannel: Send + Sync {
    fn is_connected(&self) -> bool;

    fn emit(&self, event: ClientEvent) -> Result<(), ClientError>;
}

impl OutboundChannel for ConnectionManager {
    fn is_connected(&self) -> bool {
        ConnectionManager::is_connected(self)
    }

    fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
        ConnectionManager::emit(self, event)
    }
}

/// Issues `joinRoom` / `leaveRoom` requests
pub struct RoomTracker {
    channel: Arc<dyn OutboundChannel>,
    pending: Mutex<VecDeque<GroupId>>,
}

impl RoomTracker {
    pub fn new(channel: Arc<dyn OutboundChannel>) -> Self {
        Self {
            channel,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<GroupId>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the room of `group_id`, now or on the next connect
    pub fn join_room(&self, group_id: &GroupId) {
        if self.channel.is_connected() {
            match self.emit_join(group_id) {
                Ok(()) => return,
                Err(e) => tracing::debug!("Join of '{}' deferred: {}", group_id, e),
            }
        }

        tracing::debug!("Queueing join of '{}' until connected", group_id);
        self.pending().push_back(group_id.clone());

        // The session may have come up after the check above, with the
        // connect handler already run on the empty queue
        if self.channel.is_connected() {
            self.on_connected();
        }
    }

    /// Leave the room of `group_id`; dropped when disconnected
    pub fn leave_room(&self, group_id: &GroupId) {
        if !self.channel.is_connected() {
            tracing::debug!("Not connected; leave of '{}' dropped", group_id);
            return;
        }

        let event = ClientEvent::LeaveRoom(group_id.as_str().to_string());
        if let Err(e) = self.channel.emit(event) {
            tracing::debug!("Leave of '{}' dropped: {}", group_id, e);
        }
    }

    /// Replay deferred joins. Called once per successful connect.
    pub fn on_connected(&self) {
        loop {
            // The lock is released before emitting
            let Some(group_id) = self.pending().pop_front() else {
                return;
            };

            if let Err(e) = self.emit_join(&group_id) {
                tracing::warn!("Deferred join of '{}' failed: {}", group_id, e);
                self.pending().push_front(group_id);
                return;
            }
        }
    }

    /// Joins still waiting for a connection
    pub fn pending_joins(&self) -> Vec<GroupId> {
        self.pending().iter().cloned().collect()
    }

    fn emit_join(&self, group_id: &GroupId) -> Result<(), ClientError> {
        tracing::info!("Joining room '{}'", group_id);
        self.channel
            .emit(ClientEvent::JoinRoom(group_id.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        OnceLock, Weak,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 接続前の joinRoom は接続時に 1 回だけ送られる
    // - 切断中の leaveRoom は送られない
    // - 同じグループへの join を重複排除しない
    // - 接続確認とキュー追加の間に接続が完了しても join は送られる
    // ========================================

    fn group(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    /// Channel whose connectivity can be flipped and that records every emit
    #[derive(Default)]
    struct RecordingChannel {
        connected: AtomicBool,
        sent: Mutex<Vec<ClientEvent>>,
    }

    impl RecordingChannel {
        fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }

        fn sent(&self) -> Vec<ClientEvent> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl OutboundChannel for RecordingChannel {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
            if !self.is_connected() {
                return Err(ClientError::NotConnected);
            }
            self.sent.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[test]
    fn test_join_while_connected_is_sent_immediately() {
        // テスト項目: 接続中の join はすぐに送信される
        // given (前提条件):
        let mut channel = MockOutboundChannel::new();
        channel.expect_is_connected().return_const(true);
        channel
            .expect_emit()
            .withf(|event| *event == ClientEvent::JoinRoom("g1".to_string()))
            .times(1)
            .returning(|_| Ok(()));
        let tracker = RoomTracker::new(Arc::new(channel));

        // when (操作):
        tracker.join_room(&group("g1"));

        // then (期待する結果):
        assert!(tracker.pending_joins().is_empty());
    }

    #[test]
    fn test_deferred_join_is_sent_exactly_once() {
        // テスト項目: 接続前の join は接続時に 1 回だけ送られ、再接続では送られない
        // given (前提条件):
        let channel = Arc::new(RecordingChannel::default());
        let tracker = RoomTracker::new(channel.clone());
        tracker.join_room(&group("g1"));
        assert_eq!(tracker.pending_joins(), vec![group("g1")]);

        // when (操作):
        channel.set_connected(true);
        tracker.on_connected();
        channel.set_connected(false);
        channel.set_connected(true);
        tracker.on_connected();

        // then (期待する結果):
        assert_eq!(channel.sent(), vec![ClientEvent::JoinRoom("g1".to_string())]);
        assert!(tracker.pending_joins().is_empty());
    }

    #[test]
    fn test_leave_while_disconnected_is_dropped() {
        // テスト項目: 切断中の leave は送信されず、キューにも残らない
        // given (前提条件):
        let mut channel = MockOutboundChannel::new();
        channel.expect_is_connected().return_const(false);
        channel.expect_emit().never();
        let tracker = RoomTracker::new(Arc::new(channel));

        // when (操作):
        tracker.leave_room(&group("g1"));
        tracker.on_connected();

        // then (期待する結果):
        assert!(tracker.pending_joins().is_empty());
    }

    #[test]
    fn test_leave_while_connected_is_sent() {
        // テスト項目: 接続中の leave は送信される
        // given (前提条件):
        let channel = Arc::new(RecordingChannel::default());
        channel.set_connected(true);
        let tracker = RoomTracker::new(channel.clone());

        // when (操作):
        tracker.leave_room(&group("g1"));

        // then (期待する結果):
        assert_eq!(channel.sent(), vec![ClientEvent::LeaveRoom("g1".to_string())]);
    }

    #[test]
    fn test_duplicate_joins_are_not_suppressed() {
        // テスト項目: 同じグループへの join は重複しても両方送られる
        // given (前提条件):
        let channel = Arc::new(RecordingChannel::default());
        let tracker = RoomTracker::new(channel.clone());
        tracker.join_room(&group("g1"));
        tracker.join_room(&group("g1"));

        // when (操作):
        channel.set_connected(true);
        tracker.on_connected();

        // then (期待する結果):
        assert_eq!(
            channel.sent(),
            vec![
                ClientEvent::JoinRoom("g1".to_string()),
                ClientEvent::JoinRoom("g1".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_replay_keeps_entry_for_next_connect() {
        // テスト項目: 再送中に emit が失敗した場合、先頭に戻して次の接続で送る
        // given (前提条件):
        let channel = Arc::new(RecordingChannel::default());
        let tracker = RoomTracker::new(channel.clone());
        tracker.join_room(&group("g1"));
        tracker.join_room(&group("g2"));

        // when (操作): 接続完了直後にセッションが落ちていた
        tracker.on_connected();

        // then (期待する結果):
        assert_eq!(tracker.pending_joins(), vec![group("g1"), group("g2")]);
        channel.set_connected(true);
        tracker.on_connected();
        assert_eq!(
            channel.sent(),
            vec![
                ClientEvent::JoinRoom("g1".to_string()),
                ClientEvent::JoinRoom("g2".to_string()),
            ]
        );
    }

    /// Reports disconnected on the first check, but completes the connection
    /// (including the connect handler) before returning
    #[derive(Default)]
    struct ConnectingDuringCheck {
        inner: RecordingChannel,
        checks: AtomicUsize,
        tracker: OnceLock<Weak<RoomTracker>>,
    }

    impl OutboundChannel for ConnectingDuringCheck {
        fn is_connected(&self) -> bool {
            if self.checks.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.set_connected(true);
                if let Some(tracker) = self.tracker.get().and_then(Weak::upgrade) {
                    tracker.on_connected();
                }
                return false;
            }
            self.inner.is_connected()
        }

        fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
            self.inner.emit(event)
        }
    }

    #[test]
    fn test_join_racing_connect_is_sent() {
        // テスト項目: 未接続と判定した直後に接続が完了しても、join は取り残されずに送られる
        // given (前提条件):
        let channel = Arc::new(ConnectingDuringCheck::default());
        let tracker = Arc::new(RoomTracker::new(channel.clone()));
        let _ = channel.tracker.set(Arc::downgrade(&tracker));

        // when (操作):
        tracker.join_room(&group("g1"));

        // then (期待する結果):
        assert_eq!(
            channel.inner.sent(),
            vec![ClientEvent::JoinRoom("g1".to_string())]
        );
        assert!(tracker.pending_joins().is_empty());
    }
}
