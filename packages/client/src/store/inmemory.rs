//! InMemory group store
//!
//! A single `tokio::sync::Mutex` guards the whole map, so every mutation and
//! every snapshot is atomic with respect to the others.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::model::{GroupId, Member, MoodRecord, StatusRecord, UserId};

use super::{GroupSnapshot, GroupStore, StoreChange};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct StoreState {
    known_groups: BTreeSet<GroupId>,
    groups: BTreeMap<GroupId, GroupSnapshot>,
}

impl StoreState {
    fn group_mut(&mut self, group_id: &GroupId) -> &mut GroupSnapshot {
        self.known_groups.insert(group_id.clone());
        self.groups.entry(group_id.clone()).or_default()
    }
}

/// インメモリのグループストア
///
/// Holds the set of known groups, per-group member lists and
/// per-user-per-group status/mood records.
pub struct InMemoryGroupStore {
    state: Mutex<StoreState>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(StoreState::default()),
            changes,
        }
    }

    /// Subscribe to the change feed.
    ///
    /// Slow subscribers may observe `RecvError::Lagged`; the store itself is
    /// always the source of truth.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Callers hold the state lock so the feed follows the mutation order
    fn notify(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    /// Replace the set of known groups (e.g. after fetching the user's groups)
    ///
    /// State of groups that are no longer known is discarded.
    pub async fn set_known_groups(&self, group_ids: Vec<GroupId>) {
        let known: BTreeSet<GroupId> = group_ids.into_iter().collect();
        let mut state = self.state.lock().await;
        state.groups.retain(|group_id, _| known.contains(group_id));
        state.known_groups = known.clone();
        self.notify(StoreChange::KnownGroups(known.into_iter().collect()));
    }

    pub async fn known_groups(&self) -> Vec<GroupId> {
        let state = self.state.lock().await;
        state.known_groups.iter().cloned().collect()
    }

    pub async fn snapshot(&self, group_id: &GroupId) -> Option<GroupSnapshot> {
        let state = self.state.lock().await;
        state.groups.get(group_id).cloned()
    }

    pub async fn status_of(&self, group_id: &GroupId, user_id: &UserId) -> Option<StatusRecord> {
        let state = self.state.lock().await;
        state
            .groups
            .get(group_id)
            .and_then(|group| group.statuses.get(user_id))
            .cloned()
    }

    pub async fn mood_of(&self, group_id: &GroupId, user_id: &UserId) -> Option<MoodRecord> {
        let state = self.state.lock().await;
        state
            .groups
            .get(group_id)
            .and_then(|group| group.moods.get(user_id))
            .cloned()
    }

    pub async fn members_of(&self, group_id: &GroupId) -> Vec<Member> {
        let state = self.state.lock().await;
        state
            .groups
            .get(group_id)
            .map(|group| group.members.clone())
            .unwrap_or_default()
    }

    /// Drop everything (sign-out)
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = StoreState::default();
        self.notify(StoreChange::Cleared);
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn update_group_status(&self, group_id: &GroupId, record: StatusRecord) {
        let mut state = self.state.lock().await;
        state
            .group_mut(group_id)
            .statuses
            .insert(record.user_id.clone(), record.clone());
        tracing::debug!("Status of '{}' in '{}' updated", record.user_id, group_id);
        self.notify(StoreChange::Status(record));
    }

    async fn update_group_mood(&self, group_id: &GroupId, record: MoodRecord) {
        let mut state = self.state.lock().await;
        state
            .group_mut(group_id)
            .moods
            .insert(record.user_id.clone(), record.clone());
        tracing::debug!("Mood of '{}' in '{}' updated", record.user_id, group_id);
        self.notify(StoreChange::Mood(record));
    }

    async fn update_group_members(&self, group_id: &GroupId, members: Vec<Member>) {
        let count = members.len();
        let mut state = self.state.lock().await;
        state.group_mut(group_id).members = members;
        tracing::debug!("Members of '{}' replaced ({} members)", group_id, count);
        self.notify(StoreChange::Members {
            group_id: group_id.clone(),
            count,
        });
    }
}
