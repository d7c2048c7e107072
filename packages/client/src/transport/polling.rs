//! HTTP long-polling transport.
//!
//! - `GET  <endpoint>/poll/open` (bearer) opens a session and returns its sid
//! - `GET  <endpoint>/poll?sid=` waits for queued frames
//! - `POST <endpoint>/poll?sid=` sends one frame
//! - `DELETE <endpoint>/poll?sid=` closes the session
//!
//! A background task runs the GET loop and feeds an mpsc channel, which keeps
//! [`Transport::recv`] cancel safe: a dropped `recv` future never loses a
//! response that already arrived.

use std::time::Duration;

use async_trait::async_trait;
use kibun_shared::protocol::{PollOpenResponse, PollResponse};
use reqwest::StatusCode;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    config::{ClientConfig, TransportKind},
    domain::DisconnectReason,
    error::ClientError,
};

use super::{Transport, TransportEvent};

const CLOSE_TIMEOUT: Duration = Duration::from_millis(400);

/// Established long-polling session
pub struct PollingTransport {
    sid: String,
    http: reqwest::Client,
    session_url: String,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    poller: JoinHandle<()>,
}

/// Open a long-polling session
pub async fn connect(
    http: &reqwest::Client,
    config: &ClientConfig,
    token: &str,
) -> Result<PollingTransport, ClientError> {
    let base_url = config.polling_url();
    tracing::debug!("Opening polling session at {}", base_url);

    let response = http
        .get(format!("{}/open", base_url))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    match response.status() {
        StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
        status if !status.is_success() => {
            return Err(ClientError::ConnectionError(format!(
                "unexpected status {} from {}/open",
                status, base_url
            )));
        }
        _ => {}
    }

    let open: PollOpenResponse = response
        .json()
        .await
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    let session_url = format!("{}?sid={}", base_url, open.sid);
    let (tx, inbound) = mpsc::unbounded_channel();
    let poller = tokio::spawn(poll_loop(http.clone(), session_url.clone(), tx));
    tracing::debug!("Polling session '{}' established", open.sid);

    Ok(PollingTransport {
        sid: open.sid,
        http: http.clone(),
        session_url,
        inbound,
        poller,
    })
}

/// Issue long-poll requests until the session ends or the transport is dropped
async fn poll_loop(
    http: reqwest::Client,
    session_url: String,
    tx: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        let closed = match poll_once(&http, &session_url).await {
            Ok(poll) => {
                for frame in poll.frames {
                    if tx.send(TransportEvent::Frame(frame)).is_err() {
                        return;
                    }
                }
                poll.closed.then_some(DisconnectReason::ServerDisconnect)
            }
            Err(reason) => Some(reason),
        };

        if let Some(reason) = closed {
            let _ = tx.send(TransportEvent::Closed(reason));
            return;
        }
        if tx.is_closed() {
            return;
        }
    }
}

async fn poll_once(
    http: &reqwest::Client,
    session_url: &str,
) -> Result<PollResponse, DisconnectReason> {
    let response = http
        .get(session_url)
        .send()
        .await
        .map_err(|e| DisconnectReason::TransportError(e.to_string()))?;

    match response.status() {
        status if status.is_success() => response
            .json::<PollResponse>()
            .await
            .map_err(|e| DisconnectReason::TransportError(e.to_string())),
        // The server forgot the session
        StatusCode::NOT_FOUND => Err(DisconnectReason::TransportClose),
        status => Err(DisconnectReason::TransportError(format!(
            "unexpected status {}",
            status
        ))),
    }
}

#[async_trait]
impl Transport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    fn session_id(&self) -> &str {
        &self.sid
    }

    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        let response = self
            .http
            .post(&self.session_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(frame)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ConnectionError(format!(
                "polling send rejected with status {}",
                response.status()
            )))
        }
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed(DisconnectReason::TransportClose))
    }

    async fn close(&mut self) {
        self.poller.abort();
        let request = self.http.delete(&self.session_url).timeout(CLOSE_TIMEOUT);
        if let Err(e) = request.send().await {
            tracing::debug!("Polling close failed: {}", e);
        }
    }
}

impl Drop for PollingTransport {
    fn drop(&mut self) {
        self.poller.abort();
    }
}
