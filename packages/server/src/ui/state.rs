//! Server state shared by every handler.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc},
    time::Instant,
};

use crate::{
    domain::{Outgoing, SessionId, UserId},
    usecase::UseCases,
};

/// Shared application state
pub struct AppState {
    /// 全ユースケース
    pub usecases: UseCases,
    /// long-polling セッションの受信側
    pub polling: PollingSessions,
    /// long-polling リクエストの最大待ち時間
    pub poll_timeout: Duration,
}

/// long-polling セッション 1 つ分の受信側
///
/// `PusherChannel` の送信側は MessagePusher が持ち、受信側はここに置かれて
/// `GET /poll` のたびに読み出されます。
pub struct PollingSession {
    pub user_id: UserId,
    pub inbox: Mutex<mpsc::UnboundedReceiver<Outgoing>>,
    /// 最後にクライアントからリクエストを受けた時刻
    last_seen: Mutex<Instant>,
}

impl PollingSession {
    /// クライアントからのリクエストを記録する
    pub async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    /// `max_idle` 以上リクエストがなく、処理中の `GET /poll` もない
    async fn is_idle(&self, max_idle: Duration) -> bool {
        // A poll in flight holds the inbox
        if self.inbox.try_lock().is_err() {
            return false;
        }
        self.last_seen.lock().await.elapsed() >= max_idle
    }
}

/// long-polling セッションの一覧
#[derive(Default)]
pub struct PollingSessions {
    sessions: Mutex<HashMap<SessionId, Arc<PollingSession>>>,
}

impl PollingSessions {
    pub async fn insert(
        &self,
        session_id: SessionId,
        user_id: UserId,
        inbox: mpsc::UnboundedReceiver<Outgoing>,
    ) {
        let session = Arc::new(PollingSession {
            user_id,
            inbox: Mutex::new(inbox),
            last_seen: Mutex::new(Instant::now()),
        });
        self.sessions.lock().await.insert(session_id, session);
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<PollingSession>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Sessions nobody has polled for at least `max_idle`
    pub async fn idle_sessions(&self, max_idle: Duration) -> Vec<SessionId> {
        let sessions: Vec<(SessionId, Arc<PollingSession>)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();

        let mut idle = Vec::new();
        for (session_id, session) in sessions {
            if session.is_idle(max_idle).await {
                idle.push(session_id);
            }
        }
        idle
    }

    pub async fn remove(&self, session_id: &SessionId) -> Option<Arc<PollingSession>> {
        self.sessions.lock().await.remove(session_id)
    }
}
