//! REST helper for the presence backend.
//!
//! Status changes are published over HTTP; the server fans them out to the
//! group's room as `statusUpdate` pushes.

use kibun_shared::protocol::{GroupSummary, MemberPayload, StatusRequest};
use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    config::ClientConfig,
    model::{GroupId, Member, ModelError},
};

/// REST call errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {0}")]
    Status(StatusCode),

    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] ModelError),
}

/// Thin `reqwest` wrapper around the `/api` routes
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url(),
            token: token.into(),
        }
    }

    /// `GET /api/groups`
    pub async fn groups(&self) -> Result<Vec<GroupSummary>, ApiError> {
        let response = self
            .http
            .get(format!("{}/groups", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response, "groups")?;
        Ok(response.json().await?)
    }

    /// `GET /api/groups/{group_id}/members`
    pub async fn members(&self, group_id: &GroupId) -> Result<Vec<Member>, ApiError> {
        let response = self
            .http
            .get(format!("{}/groups/{}/members", self.base_url, group_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response, group_id.as_str())?;
        let members: Vec<MemberPayload> = response.json().await?;
        let members = members
            .into_iter()
            .map(Member::try_from)
            .collect::<Result<Vec<_>, ModelError>>()?;
        Ok(members)
    }

    /// `POST /api/groups/{group_id}/status`
    pub async fn post_status(
        &self,
        group_id: &GroupId,
        request: &StatusRequest,
    ) -> Result<(), ApiError> {
        tracing::debug!("Posting status to '{}'", group_id);
        let response = self
            .http
            .post(format!("{}/groups/{}/status", self.base_url, group_id))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        check_status(response, group_id.as_str())?;
        Ok(())
    }
}

fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, ApiError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(what.to_string())),
        status => Err(ApiError::Status(status)),
    }
}
