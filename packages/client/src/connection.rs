//! Connection manager: one persistent, self-healing connection per manager.
//!
//! [`ConnectionManager`] is a thin handle around a background connection
//! task. The task owns the transport, multiplexes outbound commands, inbound
//! frames and the shutdown signal with `tokio::select!`, and reconnects
//! according to the [`ReconnectPolicy`](crate::config::ReconnectPolicy).
//!
//! Everything the task observes is reported as a [`ConnectionEvent`] on the
//! unbounded channel returned by [`ConnectionManager::new`], in order.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use kibun_shared::protocol::ClientEvent;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::{ClientConfig, TransportKind},
    domain::{
        DisconnectReason, ReconnectAction, backoff_delay, reconnect_action,
        should_attempt_reconnect, should_give_up,
    },
    error::ClientError,
    transport::{Connector, Transport, TransportEvent},
};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound for closing a transport; stays below the shutdown timeout
const TRANSPORT_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Connection lifecycle and inbound traffic, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A session was established
    Connected {
        session_id: String,
        transport: TransportKind,
    },
    /// A connection attempt failed (or the manager gave up)
    ConnectError { message: String },
    /// The session ended
    Disconnected { reason: DisconnectReason },
    /// A text frame pushed by the server
    Inbound(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the handle and the connection task
#[derive(Debug, Default)]
struct LinkState {
    connected: AtomicBool,
    session_id: Mutex<Option<String>>,
}

impl LinkState {
    fn mark_connected(&self, session_id: &str) {
        *lock(&self.session_id) = Some(session_id.to_string());
        self.connected.store(true, Ordering::Release);
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
        *lock(&self.session_id) = None;
    }
}

/// Live connection task plus the means to talk to it
struct ConnectionHandle {
    cmd_tx: mpsc::UnboundedSender<ClientEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Owns the single connection of the process (or of a test)
///
/// `connect`, `emit` and the accessors are synchronous and never block on
/// the network; they must be called from within a Tokio runtime.
pub struct ConnectionManager {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    link: Arc<LinkState>,
    handle: Mutex<Option<ConnectionHandle>>,
    shutdown_timeout: Duration,
}

impl ConnectionManager {
    /// Create a manager and the receiver of its [`ConnectionEvent`]s
    #[must_use = "the event receiver must be used to receive connection events"]
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            config,
            connector,
            events_tx,
            link: Arc::new(LinkState::default()),
            handle: Mutex::new(None),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        };
        (manager, events_rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start connecting with the given bearer token.
    ///
    /// No-op while a connection exists, even if it is currently between
    /// reconnection attempts. A connection whose task already gave up is
    /// replaced.
    pub fn connect(&self, token: &str) {
        let mut handle = lock(&self.handle);

        if let Some(existing) = handle.as_ref() {
            if !existing.task.is_finished() {
                tracing::debug!("connect() ignored: a connection already exists");
                return;
            }
            tracing::debug!("Previous connection gave up; replacing it");
        }

        if let Err(e) = self.config.validate() {
            tracing::error!("Refusing to connect: {}", e);
            let _ = self.events_tx.send(ConnectionEvent::ConnectError {
                message: e.to_string(),
            });
            return;
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let context = LoopContext {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            token: token.to_string(),
            events_tx: self.events_tx.clone(),
            link: Arc::clone(&self.link),
        };

        tracing::info!("Connecting to {}", self.config.endpoint);
        let task = tokio::spawn(connection_loop(context, cmd_rx, shutdown_rx));

        *handle = Some(ConnectionHandle {
            cmd_tx,
            shutdown_tx: Some(shutdown_tx),
            task,
        });
    }

    /// Tear down the connection and cancel pending reconnection attempts.
    ///
    /// Safe to call when no connection exists.
    pub async fn disconnect(&self) {
        let Some(mut handle) = self.take_handle() else {
            tracing::debug!("disconnect() ignored: no connection");
            return;
        };

        if let Some(tx) = handle.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if tokio::time::timeout(self.shutdown_timeout, &mut handle.task)
            .await
            .is_err()
        {
            tracing::warn!("Connection task did not exit within timeout; aborting");
            handle.task.abort();
            // The aborted task never reported the end of its session
            let _ = self.events_tx.send(ConnectionEvent::Disconnected {
                reason: DisconnectReason::ClientDisconnect,
            });
        }

        self.link.mark_disconnected();
        tracing::info!("Disconnected");
    }

    fn take_handle(&self) -> Option<ConnectionHandle> {
        lock(&self.handle).take()
    }

    /// `true` while a session is established
    pub fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::Acquire)
    }

    /// Session id of the established session
    pub fn session_id(&self) -> Option<String> {
        lock(&self.link.session_id).clone()
    }

    /// `true` if a connection task exists (connected or reconnecting)
    pub fn has_connection(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Queue an outbound event on the established session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] when no session is established.
    pub fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let handle = lock(&self.handle);
        let handle = handle.as_ref().ok_or(ClientError::NotConnected)?;
        handle
            .cmd_tx
            .send(event)
            .map_err(|_| ClientError::NotConnected)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.take_handle() {
            handle.task.abort();
        }
    }
}

// ========================================
// Connection task
// ========================================

struct LoopContext {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    token: String,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    link: Arc<LinkState>,
}

impl LoopContext {
    fn emit(&self, event: ConnectionEvent) {
        // The receiver may be gone during shutdown
        let _ = self.events_tx.send(event);
    }

    /// One connection attempt with a single transport, bounded by the timeout
    async fn open(&self, kind: TransportKind) -> Result<Box<dyn Transport>, ClientError> {
        tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(kind, &self.config, &self.token),
        )
        .await
        .map_err(|_| ClientError::Timeout)?
    }

    /// Try the transports in order of preference, then try to upgrade
    async fn establish(&self) -> Result<Box<dyn Transport>, ClientError> {
        let transports = &self.config.transports;
        let mut last_error = ClientError::Config("no transports configured".to_string());

        for (index, kind) in transports.iter().copied().enumerate() {
            match self.open(kind).await {
                Ok(transport) => {
                    return Ok(self.upgrade(transport, &transports[index + 1..]).await);
                }
                Err(e) if should_give_up(&e) => return Err(e),
                Err(e) => {
                    tracing::debug!("{} transport failed: {}", kind, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Replace a polling session with a streaming one if a later transport allows it
    async fn upgrade(
        &self,
        mut current: Box<dyn Transport>,
        remaining: &[TransportKind],
    ) -> Box<dyn Transport> {
        if current.kind().is_streaming() {
            return current;
        }

        for kind in remaining.iter().copied().filter(|kind| kind.is_streaming()) {
            match self.open(kind).await {
                Ok(upgraded) => {
                    tracing::info!("Upgraded transport from {} to {}", current.kind(), kind);
                    close_transport(current.as_mut()).await;
                    return upgraded;
                }
                Err(e) => tracing::debug!("Upgrade to {} failed: {}", kind, e),
            }
        }

        current
    }
}

/// Background task: connect, run the session, reconnect, until told to stop
async fn connection_loop(
    context: LoopContext,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let policy = context.config.reconnect;
    let mut failures: u32 = 0;

    loop {
        let established = tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("Connection cancelled before it was established");
                return;
            }
            result = context.establish() => result,
        };

        let action = match established {
            Ok(transport) => {
                failures = 0;
                let session_id = transport.session_id().to_string();
                let kind = transport.kind();

                context.link.mark_connected(&session_id);
                tracing::info!("Connected (session '{}', transport {})", session_id, kind);
                context.emit(ConnectionEvent::Connected {
                    session_id,
                    transport: kind,
                });

                let reason = run_session(transport, &mut cmd_rx, &mut shutdown_rx, &context).await;

                context.link.mark_disconnected();
                tracing::info!("Disconnected: {}", reason);
                let action = reconnect_action(&reason);
                context.emit(ConnectionEvent::Disconnected { reason });
                action
            }
            Err(e) if should_give_up(&e) => {
                tracing::error!("Connection failed and will not be retried: {}", e);
                context.emit(ConnectionEvent::ConnectError {
                    message: e.to_string(),
                });
                return;
            }
            Err(e) => {
                tracing::warn!("Connection attempt failed: {}", e);
                context.emit(ConnectionEvent::ConnectError {
                    message: e.to_string(),
                });
                ReconnectAction::Backoff
            }
        };

        match action {
            ReconnectAction::Stop => return,
            ReconnectAction::Immediate => {
                tracing::info!("Server ended the session; reconnecting now");
            }
            ReconnectAction::Backoff => {
                if !should_attempt_reconnect(failures, policy.max_attempts) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Giving up.",
                        policy.max_attempts
                    );
                    context.emit(ConnectionEvent::ConnectError {
                        message: format!("gave up after {} reconnection attempts", failures),
                    });
                    return;
                }

                let delay = backoff_delay(&policy, failures);
                failures += 1;
                tracing::info!(
                    "Reconnecting in {:?}... (attempt {}/{})",
                    delay,
                    failures,
                    policy.max_attempts
                );

                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Reconnection cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Drive one established session until it ends
/// Close `transport`, giving up after [`TRANSPORT_CLOSE_TIMEOUT`]
async fn close_transport(transport: &mut dyn Transport) {
    if tokio::time::timeout(TRANSPORT_CLOSE_TIMEOUT, transport.close())
        .await
        .is_err()
    {
        tracing::warn!("Closing the {} transport timed out", transport.kind());
    }
}

async fn run_session(
    mut transport: Box<dyn Transport>,
    cmd_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
    context: &LoopContext,
) -> DisconnectReason {
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                close_transport(transport.as_mut()).await;
                return DisconnectReason::ClientDisconnect;
            }

            cmd = cmd_rx.recv() => {
                let Some(event) = cmd else {
                    close_transport(transport.as_mut()).await;
                    return DisconnectReason::ClientDisconnect;
                };
                let frame = match event.encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("Failed to encode '{}': {}", event.name(), e);
                        continue;
                    }
                };
                tracing::debug!("Sending '{}' for group '{}'", event.name(), event.group_id());
                if let Err(e) = transport.send(frame).await {
                    tracing::warn!("Failed to send '{}': {}", event.name(), e);
                    close_transport(transport.as_mut()).await;
                    return DisconnectReason::TransportError(e.to_string());
                }
            }

            incoming = transport.recv() => match incoming {
                TransportEvent::Frame(text) => context.emit(ConnectionEvent::Inbound(text)),
                TransportEvent::Closed(reason) => return reason,
            },
        }
    }
}
