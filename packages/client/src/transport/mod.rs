//! Transports carrying protocol frames between the client and the server.
//!
//! ## Implementations
//!
//! - `websocket`: persistent WebSocket stream (`tokio-tungstenite`)
//! - `polling`: HTTP long-polling (`reqwest`)
//!
//! The connection manager only talks to the [`Transport`] and
//! [`Connector`] traits, so tests can swap in channel-backed fakes.

pub mod polling;
pub mod websocket;

use async_trait::async_trait;

use crate::{
    config::{ClientConfig, TransportKind},
    domain::DisconnectReason,
    error::ClientError,
};

pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

/// What a transport yields when read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame from the server
    Frame(String),
    /// The session is over; no more frames follow
    Closed(DisconnectReason),
}

/// An established session with the server
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Server-assigned session id
    fn session_id(&self) -> &str;

    /// Send one text frame
    async fn send(&mut self, frame: String) -> Result<(), ClientError>;

    /// Wait for the next frame.
    ///
    /// Must be cancel safe: it is polled inside `tokio::select!`.
    async fn recv(&mut self) -> TransportEvent;

    /// Close the session. Errors are ignored.
    async fn close(&mut self);
}

/// Opens transports of a given kind
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        kind: TransportKind,
        config: &ClientConfig,
        token: &str,
    ) -> Result<Box<dyn Transport>, ClientError>;
}

/// Connector backed by the real WebSocket and long-polling transports
#[derive(Debug, Clone, Default)]
pub struct DefaultConnector {
    http: reqwest::Client,
}

impl DefaultConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(
        &self,
        kind: TransportKind,
        config: &ClientConfig,
        token: &str,
    ) -> Result<Box<dyn Transport>, ClientError> {
        match kind {
            TransportKind::WebSocket => {
                let transport = websocket::connect(config, token).await?;
                Ok(Box::new(transport))
            }
            TransportKind::Polling => {
                let transport = polling::connect(&self.http, config, token).await?;
                Ok(Box::new(transport))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Channel-backed fakes for the transport seam.

    use std::{
        collections::HashSet,
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
    };

    use tokio::sync::mpsc;

    use super::*;

    /// Server side of a fake session, handed to the test
    pub struct Peer {
        pub sid: String,
        pub kind: TransportKind,
        /// Push events to the client
        pub push: mpsc::UnboundedSender<TransportEvent>,
        /// Frames the client sent
        pub sent: mpsc::UnboundedReceiver<String>,
    }

    pub struct FakeTransport {
        kind: TransportKind,
        sid: String,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
        outbound: mpsc::UnboundedSender<String>,
        hang_on_close: bool,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn kind(&self) -> TransportKind {
            self.kind
        }

        fn session_id(&self) -> &str {
            &self.sid
        }

        async fn send(&mut self, frame: String) -> Result<(), ClientError> {
            self.outbound
                .send(frame)
                .map_err(|e| ClientError::ConnectionError(e.to_string()))
        }

        async fn recv(&mut self) -> TransportEvent {
            self.inbound
                .recv()
                .await
                .unwrap_or(TransportEvent::Closed(DisconnectReason::TransportClose))
        }

        async fn close(&mut self) {
            if self.hang_on_close {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Connector producing [`FakeTransport`]s
    pub struct FakeConnector {
        attempts: Mutex<Vec<TransportKind>>,
        refused: HashSet<TransportKind>,
        failures_left: AtomicU32,
        unauthorized: bool,
        hang_on_close: bool,
        sessions: AtomicU32,
        peers: mpsc::UnboundedSender<Peer>,
    }

    impl FakeConnector {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<Peer>) {
            let (peers, peers_rx) = mpsc::unbounded_channel();
            let connector = Self {
                attempts: Mutex::new(Vec::new()),
                refused: HashSet::new(),
                failures_left: AtomicU32::new(0),
                unauthorized: false,
                hang_on_close: false,
                sessions: AtomicU32::new(0),
                peers,
            };
            (connector, peers_rx)
        }

        /// Always refuse the given transport kind
        pub fn refusing(mut self, kind: TransportKind) -> Self {
            self.refused.insert(kind);
            self
        }

        /// Fail the next `count` attempts
        pub fn failing_first(self, count: u32) -> Self {
            self.failures_left.store(count, Ordering::SeqCst);
            self
        }

        /// Reject every attempt as unauthorized
        pub fn unauthorized(mut self) -> Self {
            self.unauthorized = true;
            self
        }

        /// Sessions whose `close` never completes (unreachable server)
        pub fn hanging_on_close(mut self) -> Self {
            self.hang_on_close = true;
            self
        }

        pub fn attempts(&self) -> Vec<TransportKind> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(
            &self,
            kind: TransportKind,
            _config: &ClientConfig,
            _token: &str,
        ) -> Result<Box<dyn Transport>, ClientError> {
            self.attempts.lock().unwrap().push(kind);

            if self.unauthorized {
                return Err(ClientError::Unauthorized);
            }
            if self.refused.contains(&kind) {
                return Err(ClientError::ConnectionError(format!("{} refused", kind)));
            }
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ClientError::ConnectionError("connection refused".to_string()));
            }

            let number = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
            let sid = format!("sid-{}", number);
            let (push, inbound) = mpsc::unbounded_channel();
            let (outbound, sent) = mpsc::unbounded_channel();
            let _ = self.peers.send(Peer {
                sid: sid.clone(),
                kind,
                push,
                sent,
            });

            Ok(Box::new(FakeTransport {
                kind,
                sid,
                inbound,
                outbound,
                hang_on_close: self.hang_on_close,
            }))
        }
    }
}
