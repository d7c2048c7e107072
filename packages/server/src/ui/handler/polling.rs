//! Long-polling transport handlers.
//!
//! - `GET /poll/open` opens a session (bearer auth) and returns its sid
//! - `GET /poll?sid=` waits up to the poll timeout for queued frames
//! - `POST /poll?sid=` carries one client frame
//! - `DELETE /poll?sid=` closes the session
//!
//! Sessions that stop polling without a DELETE are ended by
//! [`spawn_idle_reaper`] after [`IDLE_POLL_FACTOR`] poll timeouts.

use std::{sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use kibun_shared::protocol::{PollOpenResponse, PollResponse};
use serde::Deserialize;
use tokio::{
    sync::mpsc::{self, error::TryRecvError},
    task::JoinHandle,
};

use crate::{
    domain::{Outgoing, SessionId},
    ui::{auth::AuthenticatedUser, state::AppState},
};

use super::frame::{FrameError, handle_client_frame};

/// Poll timeouts without any request after which a session is ended
pub const IDLE_POLL_FACTOR: u32 = 3;

const MIN_REAP_PERIOD: Duration = Duration::from_millis(10);

/// Query parameters identifying a polling session
#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub sid: String,
}

impl PollQuery {
    fn session_id(&self) -> Result<SessionId, StatusCode> {
        SessionId::parse(self.sid.as_str()).map_err(|_| StatusCode::BAD_REQUEST)
    }
}

pub async fn open_polling(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PollOpenResponse>, StatusCode> {
    let (tx, rx) = mpsc::unbounded_channel();

    let session = state
        .usecases
        .connect_session
        .execute(user_id.clone(), tx)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to open polling session: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state
        .polling
        .insert(session.id.clone(), user_id, rx)
        .await;
    tracing::info!("Polling session '{}' opened", session.id);

    Ok(Json(PollOpenResponse {
        sid: session.id.to_string(),
    }))
}

pub async fn poll(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, StatusCode> {
    let session_id = query.session_id()?;
    let session = state
        .polling
        .get(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    session.touch().await;

    let mut response = PollResponse::default();
    {
        let mut inbox = session.inbox.lock().await;

        // Nothing within the timeout: answer empty and let the client poll again
        let Ok(mut next) = tokio::time::timeout(state.poll_timeout, inbox.recv()).await else {
            return Ok(Json(response));
        };

        loop {
            match next {
                Some(Outgoing::Frame(frame)) => response.frames.push(frame),
                Some(Outgoing::Close) | None => {
                    response.closed = true;
                    break;
                }
            }
            next = match inbox.try_recv() {
                Ok(outgoing) => Some(outgoing),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => None,
            };
        }
    }
    session.touch().await;

    tracing::debug!(
        "Poll for '{}' ({}) returned {} frames",
        session_id,
        session.user_id,
        response.frames.len()
    );

    if response.closed {
        end_session(&state, &session_id).await;
    }

    Ok(Json(response))
}

pub async fn send_polling(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
    body: String,
) -> StatusCode {
    let session_id = match query.session_id() {
        Ok(session_id) => session_id,
        Err(status) => return status,
    };
    let Some(session) = state.polling.get(&session_id).await else {
        return StatusCode::NOT_FOUND;
    };
    session.touch().await;

    match handle_client_frame(&state, &session_id, &body).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(FrameError::Room(e)) => {
            tracing::warn!("Room operation for '{}' failed: {}", session_id, e);
            StatusCode::NOT_FOUND
        }
        Err(e) => {
            tracing::warn!("Rejected frame from session '{}': {}", session_id, e);
            StatusCode::BAD_REQUEST
        }
    }
}

pub async fn close_polling(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> StatusCode {
    let session_id = match query.session_id() {
        Ok(session_id) => session_id,
        Err(status) => return status,
    };

    if end_session(&state, &session_id).await {
        tracing::info!("Polling session '{}' closed by the client", session_id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Forget the polling session and disconnect it; false if it was already gone
async fn end_session(state: &AppState, session_id: &SessionId) -> bool {
    if state.polling.remove(session_id).await.is_none() {
        return false;
    }
    if let Err(e) = state
        .usecases
        .disconnect_session
        .execute(session_id)
        .await
    {
        tracing::warn!("Failed to disconnect session '{}': {}", session_id, e);
    }
    true
}

/// End every session nobody has polled for `max_idle`; returns how many
pub async fn reap_idle_sessions(state: &AppState, max_idle: Duration) -> usize {
    let mut reaped = 0;
    for session_id in state.polling.idle_sessions(max_idle).await {
        if end_session(state, &session_id).await {
            tracing::info!("Polling session '{}' reaped after {:?} idle", session_id, max_idle);
            reaped += 1;
        }
    }
    reaped
}

/// Periodically reap abandoned polling sessions
pub fn spawn_idle_reaper(state: Arc<AppState>) -> JoinHandle<()> {
    // interval() rejects a zero period
    let period = state.poll_timeout.max(MIN_REAP_PERIOD);
    let max_idle = period * IDLE_POLL_FACTOR;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            reap_idle_sessions(&state, max_idle).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use kibun_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{GroupId, UserId},
        infrastructure::{
            message_pusher::ChannelMessagePusher, repository::InMemoryPresenceRepository,
        },
        ui::state::PollingSessions,
        usecase::UseCases,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - DELETE を送らずに放置された polling セッションは回収される
    // - 回収時にはルームからも抜け、配信先から外れる
    // - ポーリングを続けているセッションは回収されない
    // ========================================

    const POLL_TIMEOUT: Duration = Duration::from_millis(10);
    const MAX_IDLE: Duration = Duration::from_millis(30);

    fn app_state() -> Arc<AppState> {
        let usecases = UseCases::new(
            Arc::new(InMemoryPresenceRepository::new()),
            Arc::new(ChannelMessagePusher::new()),
            Arc::new(FixedClock::new(1704067200000)),
        );
        Arc::new(AppState {
            usecases,
            polling: PollingSessions::default(),
            poll_timeout: POLL_TIMEOUT,
        })
    }

    async fn open(state: &Arc<AppState>, user: &str) -> SessionId {
        let Json(opened) = open_polling(
            State(state.clone()),
            AuthenticatedUser(UserId::new(user).unwrap()),
        )
        .await
        .unwrap();
        SessionId::parse(opened.sid).unwrap()
    }

    #[tokio::test]
    async fn test_abandoned_session_is_reaped() {
        // テスト項目: ポーリングが途絶えたセッションは終了され、ルームからも抜ける
        // given (前提条件):
        let state = app_state();
        let g1 = GroupId::new("g1").unwrap();
        let session_id = open(&state, "alice").await;
        state
            .usecases
            .join_room
            .execute(&session_id, &g1)
            .await
            .unwrap();
        tokio::time::sleep(MAX_IDLE * 2).await;

        // when (操作):
        let reaped = reap_idle_sessions(&state, MAX_IDLE).await;

        // then (期待する結果):
        assert_eq!(reaped, 1);
        assert!(state.polling.get(&session_id).await.is_none());
        let group = state.usecases.get_group_members.execute(&g1).await.unwrap();
        assert_eq!(group.member_count(), 0);
    }

    #[tokio::test]
    async fn test_polling_session_is_kept() {
        // テスト項目: 直前にポーリングしたセッションは回収されない
        // given (前提条件):
        let state = app_state();
        let session_id = open(&state, "alice").await;
        tokio::time::sleep(MAX_IDLE * 2).await;
        let response = poll(
            State(state.clone()),
            Query(PollQuery {
                sid: session_id.to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(!response.0.closed);

        // when (操作):
        let reaped = reap_idle_sessions(&state, MAX_IDLE).await;

        // then (期待する結果):
        assert_eq!(reaped, 0);
        assert!(state.polling.get(&session_id).await.is_some());
    }

    #[tokio::test]
    async fn test_reaped_session_is_gone_for_later_polls() {
        // テスト項目: 回収済みのセッションへの GET / DELETE は 404 になる
        // given (前提条件):
        let state = app_state();
        let session_id = open(&state, "alice").await;
        tokio::time::sleep(MAX_IDLE * 2).await;
        reap_idle_sessions(&state, MAX_IDLE).await;
        let query = || {
            Query(PollQuery {
                sid: session_id.to_string(),
            })
        };

        // when (操作):
        let polled = poll(State(state.clone()), query()).await;
        let closed = close_polling(State(state.clone()), query()).await;

        // then (期待する結果):
        assert_eq!(polled.err(), Some(StatusCode::NOT_FOUND));
        assert_eq!(closed, StatusCode::NOT_FOUND);
    }
}
