//! Frames sent by clients, shared by the WebSocket and long-polling handlers.

use kibun_shared::protocol::{ClientEvent, ProtocolError};
use thiserror::Error;

use crate::{
    domain::{GroupId, SessionId, ValueObjectError},
    ui::state::AppState,
    usecase::RoomError,
};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Invalid group id: {0}")]
    InvalidGroup(#[from] ValueObjectError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Decode one client frame and run the room operation it names
pub async fn handle_client_frame(
    state: &AppState,
    session_id: &SessionId,
    text: &str,
) -> Result<(), FrameError> {
    let event = ClientEvent::decode(text)?;
    tracing::debug!("Session '{}' sent {}", session_id, event.name());

    let group_id = GroupId::new(event.group_id())?;
    match event {
        ClientEvent::JoinRoom(_) => {
            state
                .usecases
                .join_room
                .execute(session_id, &group_id)
                .await?;
        }
        ClientEvent::LeaveRoom(_) => {
            state
                .usecases
                .leave_room
                .execute(session_id, &group_id)
                .await?;
        }
    }
    Ok(())
}
