//! Presence client: wires the connection manager, room tracker, dispatcher,
//! store and preferences together.
//!
//! A single event-loop task consumes [`ConnectionEvent`]s in order and runs
//! each handler to completion before taking the next one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kibun_shared::time::Clock;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::{ClientConfig, TransportKind},
    connection::{ConnectionEvent, ConnectionManager},
    dispatcher::EventDispatcher,
    domain::DisconnectReason,
    model::{GroupId, MoodRecord, StatusRecord, UserId},
    room::RoomTracker,
    storage::{Preferences, StorageError, apply_order},
    store::InMemoryGroupStore,
    transport::Connector,
};

/// Connection state published to UI layers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected {
        session_id: String,
        transport: TransportKind,
    },
    /// The last session ended or failed; the manager may be retrying
    Interrupted { reason: String },
}

/// Composition root of the realtime core
pub struct PresenceClient {
    user_id: UserId,
    connection: Arc<ConnectionManager>,
    rooms: Arc<RoomTracker>,
    store: Arc<InMemoryGroupStore>,
    preferences: Arc<Preferences>,
    selected: Mutex<Option<GroupId>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    event_loop: JoinHandle<()>,
}

impl PresenceClient {
    /// Build the client and start its event loop. Must be called within a
    /// Tokio runtime.
    pub fn new(
        user_id: UserId,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        preferences: Preferences,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (connection, events) = ConnectionManager::new(config, connector);
        let connection = Arc::new(connection);
        let rooms = Arc::new(RoomTracker::new(connection.clone()));
        let store = Arc::new(InMemoryGroupStore::new());
        let dispatcher = EventDispatcher::new(store.clone(), clock);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());

        let event_loop = tokio::spawn(event_loop(events, rooms.clone(), dispatcher, status_tx));

        Self {
            user_id,
            connection,
            rooms,
            store,
            preferences: Arc::new(preferences),
            selected: Mutex::new(None),
            status_rx,
            event_loop,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &Arc<InMemoryGroupStore> {
        &self.store
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Watch the connection status
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    fn selected(&self) -> MutexGuard<'_, Option<GroupId>> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selected_group(&self) -> Option<GroupId> {
        self.selected().clone()
    }

    /// Start connecting; returns immediately
    pub fn connect(&self, token: &str) {
        self.connection.connect(token);
    }

    /// Make `group_id` the selected group: leave the previous room, join the new
    /// one and remember the choice.
    pub async fn select_group(&self, group_id: GroupId) -> Result<(), StorageError> {
        let previous = self.selected().replace(group_id.clone());

        match previous {
            Some(previous) if previous == group_id => {
                tracing::debug!("Group '{}' is already selected", group_id);
                return Ok(());
            }
            Some(previous) => self.rooms.leave_room(&previous),
            None => {}
        }

        tracing::info!("Selected group '{}'", group_id);
        self.rooms.join_room(&group_id);
        self.preferences.set_selected_group(Some(&group_id)).await
    }

    /// Leave the selected group's room and forget the selection
    pub async fn leave_selected_group(&self) -> Result<Option<GroupId>, StorageError> {
        let Some(group_id) = self.selected().take() else {
            return Ok(None);
        };

        self.rooms.leave_room(&group_id);
        self.preferences.set_selected_group(None).await?;
        Ok(Some(group_id))
    }

    /// Re-select the group saved in the preferences, if any
    pub async fn restore_selected_group(&self) -> Result<Option<GroupId>, StorageError> {
        let Some(group_id) = self.preferences.selected_group().await else {
            return Ok(None);
        };
        self.select_group(group_id.clone()).await?;
        Ok(Some(group_id))
    }

    /// Statuses of `group_id` in the order this user saved
    pub async fn statuses_in_order(&self, group_id: &GroupId) -> Vec<StatusRecord> {
        let mut statuses: Vec<StatusRecord> = self
            .store
            .snapshot(group_id)
            .await
            .map(|snapshot| snapshot.statuses.into_values().collect())
            .unwrap_or_default();
        let order = self.preferences.status_order(&self.user_id).await;
        apply_order(&mut statuses, &order, |record| &record.user_id);
        statuses
    }

    /// Moods of `group_id` in the order this user saved
    pub async fn moods_in_order(&self, group_id: &GroupId) -> Vec<MoodRecord> {
        let mut moods: Vec<MoodRecord> = self
            .store
            .snapshot(group_id)
            .await
            .map(|snapshot| snapshot.moods.into_values().collect())
            .unwrap_or_default();
        let order = self.preferences.mood_order(&self.user_id).await;
        apply_order(&mut moods, &order, |record| &record.user_id);
        moods
    }

    /// Disconnect and drop every piece of local state
    pub async fn sign_out(&self) -> Result<(), StorageError> {
        tracing::info!("Signing out '{}'", self.user_id);
        self.connection.disconnect().await;
        self.selected().take();
        self.store.clear().await;
        self.preferences.clear().await
    }
}

impl Drop for PresenceClient {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn event_loop(
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    rooms: Arc<RoomTracker>,
    dispatcher: EventDispatcher,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Connected {
                session_id,
                transport,
            } => {
                status_tx.send_replace(ConnectionStatus::Connected {
                    session_id,
                    transport,
                });
                rooms.on_connected();
            }
            ConnectionEvent::Inbound(text) => {
                dispatcher.dispatch(&text).await;
            }
            ConnectionEvent::Disconnected { reason } => {
                let status = match reason {
                    DisconnectReason::ClientDisconnect => ConnectionStatus::Disconnected,
                    other => ConnectionStatus::Interrupted {
                        reason: other.to_string(),
                    },
                };
                status_tx.send_replace(status);
            }
            ConnectionEvent::ConnectError { message } => {
                status_tx.send_replace(ConnectionStatus::Interrupted { reason: message });
            }
        }
    }
    tracing::debug!("Connection event loop finished");
}
