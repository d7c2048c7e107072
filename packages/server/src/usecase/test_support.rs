//! ユースケースのテスト用ヘルパー

use std::sync::Arc;

use kibun_shared::{protocol::ServerEvent, time::FixedClock};
use tokio::sync::mpsc;

use crate::{
    domain::{GroupId, Outgoing, PresenceRepository, SessionId, UserId},
    infrastructure::{
        message_pusher::ChannelMessagePusher, repository::InMemoryPresenceRepository,
    },
};

use super::ConnectSessionUseCase;

/// 固定時刻
pub const NOW: i64 = 1704067200000;

/// In-memory の Repository と MessagePusher に接続済みのセッションを作るフィクスチャ
pub struct Fixture {
    pub repository: Arc<InMemoryPresenceRepository>,
    pub message_pusher: Arc<ChannelMessagePusher>,
    pub clock: Arc<FixedClock>,
    connect: ConnectSessionUseCase,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let message_pusher = Arc::new(ChannelMessagePusher::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let connect =
            ConnectSessionUseCase::new(repository.clone(), message_pusher.clone(), clock.clone());
        Self {
            repository,
            message_pusher,
            clock,
            connect,
        }
    }

    /// セッションを接続し、その ID と受信側を返す
    pub async fn connect(&self, user_id: &str) -> (SessionId, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = self
            .connect
            .execute(UserId::new(user_id).unwrap(), tx)
            .await
            .unwrap();
        (session.id, rx)
    }

    /// セッションを接続してルームにも参加させる（通知は送らない）
    pub async fn connect_in(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> (SessionId, mpsc::UnboundedReceiver<Outgoing>) {
        let (session_id, rx) = self.connect(user_id).await;
        self.repository
            .join_room(&session_id, &GroupId::new(group_id).unwrap())
            .await
            .unwrap();
        (session_id, rx)
    }
}

/// 受信済みのフレームをすべてデコードして取り出す
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<Outgoing>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(outgoing) = rx.try_recv() {
        if let Outgoing::Frame(frame) = outgoing {
            events.push(ServerEvent::decode(&frame).unwrap());
        }
    }
    events
}
