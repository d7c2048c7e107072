//! Shared group state store.
//!
//! The dispatcher only sees the [`GroupStore`] mutation interface; readers
//! (UI layers, the terminal client) use the concrete store's accessors and
//! its change feed.

pub mod inmemory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::{GroupId, Member, MoodRecord, StatusRecord, UserId};

pub use inmemory::InMemoryGroupStore;

/// Mutation interface consumed by the inbound event dispatcher
///
/// Each call is applied atomically: readers never observe a partially
/// written record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Upsert the status of `record.user_id` in `group_id`
    async fn update_group_status(&self, group_id: &GroupId, record: StatusRecord);

    /// Upsert the mood of `record.user_id` in `group_id`
    async fn update_group_mood(&self, group_id: &GroupId, record: MoodRecord);

    /// Replace the whole member list of `group_id`
    async fn update_group_members(&self, group_id: &GroupId, members: Vec<Member>);
}

/// Consistent copy of one group's state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub members: Vec<Member>,
    pub statuses: BTreeMap<UserId, StatusRecord>,
    pub moods: BTreeMap<UserId, MoodRecord>,
}

/// Notification sent after every applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Status(StatusRecord),
    Mood(MoodRecord),
    Members { group_id: GroupId, count: usize },
    KnownGroups(Vec<GroupId>),
    Cleared,
}
