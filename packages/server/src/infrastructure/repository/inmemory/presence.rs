//! InMemory Presence Repository 実装
//!
//! ドメイン層が定義する PresenceRepository trait の具体的な実装。
//! HashMap / BTreeMap をインメモリ DB として使用します。
//!
//! ## 技術的負債
//!
//! グループは一度作成されると、全員が退出しても削除されません
//! （最後のステータスを次の参加者に配信するため）。
//! 開発サーバーでは許容していますが、長時間稼働させるとグループが溜まり続けます。

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Group, GroupId, PresenceRepository, RepositoryError, Session, SessionId, StatusEntry,
};

#[derive(Debug, Default)]
struct PresenceState {
    sessions: HashMap<SessionId, Session>,
    groups: BTreeMap<GroupId, Group>,
}

/// インメモリ Presence Repository 実装
#[derive(Debug, Default)]
pub struct InMemoryPresenceRepository {
    state: Mutex<PresenceState>,
}

impl InMemoryPresenceRepository {
    /// 新しい InMemoryPresenceRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceRepository for InMemoryPresenceRepository {
    async fn add_session(&self, session: Session) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(&session.id) {
            return Err(RepositoryError::SessionAlreadyExists(
                session.id.to_string(),
            ));
        }
        state.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn remove_session(&self, session_id: &SessionId) -> Result<Session, RepositoryError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .remove(session_id)
            .ok_or_else(|| RepositoryError::SessionNotFound(session_id.to_string()))?;

        for group_id in &session.rooms {
            if let Some(group) = state.groups.get_mut(group_id) {
                group.leave(session_id);
            }
        }

        Ok(session)
    }

    async fn find_session(&self, session_id: &SessionId) -> Option<Session> {
        let state = self.state.lock().await;
        state.sessions.get(session_id).cloned()
    }

    async fn join_room(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RepositoryError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::SessionNotFound(session_id.to_string()))?;
        session.rooms.insert(group_id.clone());
        let user_id = session.user_id.clone();

        let group = state
            .groups
            .entry(group_id.clone())
            .or_insert_with(|| Group::new(group_id.clone()));
        group.join(session_id.clone(), user_id);

        Ok(group.clone())
    }

    async fn leave_room(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RepositoryError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::SessionNotFound(session_id.to_string()))?;
        session.rooms.remove(group_id);

        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| RepositoryError::GroupNotFound(group_id.to_string()))?;
        group.leave(session_id);

        Ok(group.clone())
    }

    async fn find_group(&self, group_id: &GroupId) -> Option<Group> {
        let state = self.state.lock().await;
        state.groups.get(group_id).cloned()
    }

    async fn list_groups(&self) -> Vec<Group> {
        let state = self.state.lock().await;
        state.groups.values().cloned().collect()
    }

    async fn save_status(&self, entry: StatusEntry) -> Result<Group, RepositoryError> {
        let mut state = self.state.lock().await;
        let group = state
            .groups
            .get_mut(&entry.group_id)
            .ok_or_else(|| RepositoryError::GroupNotFound(entry.group_id.to_string()))?;
        group.set_status(entry);
        Ok(group.clone())
    }

    async fn rename_group(
        &self,
        group_id: &GroupId,
        name: String,
    ) -> Result<Group, RepositoryError> {
        let mut state = self.state.lock().await;
        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| RepositoryError::GroupNotFound(group_id.to_string()))?;
        group.name = Some(name);
        Ok(group.clone())
    }
}
