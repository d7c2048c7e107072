//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use kibun_shared::protocol::{ConnectPayload, ServerEvent};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{Outgoing, SessionId, UserId},
    ui::{auth::AuthenticatedUser, state::AppState},
};

use super::frame::handle_client_frame;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> impl IntoResponse {
    tracing::info!("WebSocket upgrade requested by '{}'", user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Spawns a task that drains the session channel into the WebSocket sink.
///
/// `Outgoing::Close` sends a close frame and ends the task, which in turn
/// ends the session.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            match outgoing {
                Outgoing::Frame(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (tx, rx) = mpsc::unbounded_channel();

    let session = match state.usecases.connect_session.execute(user_id, tx).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Failed to connect WebSocket session: {}", e);
            return;
        }
    };
    let session_id = session.id.clone();
    let (mut sender, mut receiver) = socket.split();

    // The handshake goes out before anything queued on the session channel
    match ServerEvent::Connect(ConnectPayload {
        sid: session_id.to_string(),
    })
    .encode()
    {
        Ok(handshake) => {
            if let Err(e) = sender.send(Message::Text(handshake.into())).await {
                tracing::error!("Failed to send handshake to '{}': {}", session_id, e);
                disconnect(&state, &session_id).await;
                return;
            }
        }
        Err(e) => {
            tracing::error!("Failed to encode handshake: {}", e);
            disconnect(&state, &session_id).await;
            return;
        }
    }

    let state_clone = state.clone();
    let session_id_clone = session_id.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if let Err(e) =
                        handle_client_frame(&state_clone, &session_id_clone, text.as_str()).await
                    {
                        tracing::warn!(
                            "Rejected frame from session '{}': {}",
                            session_id_clone,
                            e
                        );
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("Session '{}' requested close", session_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push frames to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    disconnect(&state, &session_id).await;
}

async fn disconnect(state: &AppState, session_id: &SessionId) {
    if let Err(e) = state
        .usecases
        .disconnect_session
        .execute(session_id)
        .await
    {
        tracing::warn!("Failed to disconnect session '{}': {}", session_id, e);
    }
}
