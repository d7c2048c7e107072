//! Domain entities: sessions, groups and their statuses.

use std::collections::{BTreeMap, BTreeSet};

use super::{GroupId, SessionId, Timestamp, UserId};

/// 1 つの接続（WebSocket または long-polling）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub connected_at: Timestamp,
    /// 参加中のルーム
    pub rooms: BTreeSet<GroupId>,
}

impl Session {
    pub fn new(id: SessionId, user_id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            connected_at,
            rooms: BTreeSet::new(),
        }
    }
}

/// あるグループにおけるユーザーの最新ステータス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub text: String,
    pub emoji: Option<String>,
    pub mood: Option<String>,
    pub updated_at: Timestamp,
}

/// グループ（= ルーム）
///
/// メンバーは「ルームに参加中のセッションを持つユーザー」から導出されます。
/// 同じユーザーが複数セッションで参加していても、メンバーとしては 1 人です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: Option<String>,
    pub sessions: BTreeMap<SessionId, UserId>,
    pub statuses: BTreeMap<UserId, StatusEntry>,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            name: None,
            sessions: BTreeMap::new(),
            statuses: BTreeMap::new(),
        }
    }

    pub fn join(&mut self, session_id: SessionId, user_id: UserId) {
        self.sessions.insert(session_id, user_id);
    }

    /// Returns whether the session was in the room
    pub fn leave(&mut self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// ステータスを保存（ユーザーごとに最新の 1 件のみ保持）
    pub fn set_status(&mut self, entry: StatusEntry) {
        self.statuses.insert(entry.user_id.clone(), entry);
    }

    /// ルームに参加中のユーザー（重複なし、ID 順）
    pub fn members(&self) -> Vec<UserId> {
        self.sessions
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// ルームに参加中のセッション（配信先）
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members().len()
    }
}
