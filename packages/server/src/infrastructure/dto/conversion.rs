//! Conversion logic from domain entities to wire payloads.

use kibun_shared::{
    protocol::{
        GroupSummary, GroupUpdatePayload, MemberPayload, MemberUpdatePayload,
        StatusUpdatePayload,
    },
    time::millis_to_rfc3339,
};

use crate::domain::{Group, StatusEntry};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&StatusEntry> for StatusUpdatePayload {
    fn from(entry: &StatusEntry) -> Self {
        Self {
            user_id: entry.user_id.as_str().to_string(),
            group_id: entry.group_id.as_str().to_string(),
            text: entry.text.clone(),
            emoji: entry.emoji.clone(),
            mood: entry.mood.clone(),
            updated_at: Some(millis_to_rfc3339(entry.updated_at.value())),
        }
    }
}

impl From<&Group> for MemberUpdatePayload {
    fn from(group: &Group) -> Self {
        Self {
            group_id: group.id.as_str().to_string(),
            members: member_payloads(group),
        }
    }
}

impl From<&Group> for GroupUpdatePayload {
    fn from(group: &Group) -> Self {
        Self {
            group_id: Some(group.id.as_str().to_string()),
            name: group.name.clone(),
        }
    }
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            group_id: group.id.as_str().to_string(),
            name: group.name.clone(),
            member_count: group.member_count(),
        }
    }
}

/// Member list of a group; the dev server knows no display names or avatars
pub fn member_payloads(group: &Group) -> Vec<MemberPayload> {
    group
        .members()
        .into_iter()
        .map(|user_id| MemberPayload {
            user_id: user_id.into_string(),
            display_name: None,
            avatar: None,
        })
        .collect()
}
