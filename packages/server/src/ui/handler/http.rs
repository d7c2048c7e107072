//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kibun_shared::protocol::{GroupRenameRequest, GroupSummary, MemberPayload, StatusRequest};

use crate::{
    domain::{GroupId, SessionId},
    infrastructure::dto::member_payloads,
    ui::{auth::AuthenticatedUser, state::AppState},
    usecase::{GetGroupError, PublishStatusError, RenameGroupError, StatusInput},
};

fn parse_group_id(group_id: String) -> Result<GroupId, StatusCode> {
    GroupId::new(group_id).map_err(|e| {
        tracing::warn!("Invalid group id: {}", e);
        StatusCode::BAD_REQUEST
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of groups
pub async fn get_groups(State(state): State<Arc<AppState>>) -> Json<Vec<GroupSummary>> {
    let groups = state.usecases.get_groups.execute().await;

    // Domain Model から DTO への変換
    Json(groups.iter().map(GroupSummary::from).collect())
}

/// Get members of one group
pub async fn get_group_members(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<MemberPayload>>, StatusCode> {
    let group_id = parse_group_id(group_id)?;
    match state.usecases.get_group_members.execute(&group_id).await {
        Ok(group) => Ok(Json(member_payloads(&group))),
        Err(GetGroupError::GroupNotFound(_)) => Err(StatusCode::NOT_FOUND),
    }
}

/// Publish the caller's status to a group
pub async fn post_status(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(group_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> StatusCode {
    let group_id = match parse_group_id(group_id) {
        Ok(group_id) => group_id,
        Err(status) => return status,
    };
    let input = StatusInput {
        text: request.text,
        emoji: request.emoji,
        mood: request.mood,
    };

    match state
        .usecases
        .publish_status
        .execute(user_id, group_id, input)
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(PublishStatusError::GroupNotFound(_)) => StatusCode::NOT_FOUND,
        Err(PublishStatusError::Encode(e)) => {
            tracing::error!("Failed to publish status: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Rename a group and notify its room
pub async fn rename_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<String>,
    Json(request): Json<GroupRenameRequest>,
) -> Result<Json<GroupSummary>, StatusCode> {
    let group_id = parse_group_id(group_id)?;
    match state
        .usecases
        .rename_group
        .execute(&group_id, &request.name)
        .await
    {
        Ok(group) => Ok(Json(GroupSummary::from(&group))),
        Err(RenameGroupError::GroupNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(RenameGroupError::EmptyName) => Err(StatusCode::BAD_REQUEST),
        Err(RenameGroupError::Encode(e)) => {
            tracing::error!("Failed to rename group: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// End a session from the server side
pub async fn kick_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    let Ok(session_id) = SessionId::parse(session_id) else {
        return StatusCode::BAD_REQUEST;
    };
    match state.usecases.kick_session.execute(&session_id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::NOT_FOUND,
    }
}
