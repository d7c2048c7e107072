//! Wire protocol shared by the presence client and the relay server.
//!
//! Every message on every transport is a JSON text frame of the shape
//! `{"event": "<name>", "data": <payload>}`. Decoding happens in two steps
//! (frame first, then the payload for the named event) so that callers can
//! tell an unknown event apart from a malformed payload.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// Handshake frame, always the first frame sent by the server.
pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_STATUS_UPDATE: &str = "statusUpdate";
pub const EVENT_GROUP_UPDATE: &str = "groupUpdate";
pub const EVENT_MEMBER_UPDATE: &str = "memberUpdate";
pub const EVENT_JOIN_ROOM: &str = "joinRoom";
pub const EVENT_LEAVE_ROOM: &str = "leaveRoom";

/// Protocol decoding/encoding errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text is not a `{event, data}` JSON object
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),

    /// The event name is not part of the protocol
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    /// The payload does not match the schema of the named event
    #[error("Invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload could not be serialized
    #[error("Failed to encode '{event}': {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw frame as it travels over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::InvalidFrame)
    }

    fn encode<T: Serialize>(event: &str, payload: &T) -> Result<String, ProtocolError> {
        let data = serde_json::to_value(payload).map_err(|source| ProtocolError::Encode {
            event: event.to_string(),
            source,
        })?;
        let frame = Frame {
            event: event.to_string(),
            data,
        };
        serde_json::to_string(&frame).map_err(|source| ProtocolError::Encode {
            event: event.to_string(),
            source,
        })
    }

    fn payload<T: DeserializeOwned>(self) -> Result<T, ProtocolError> {
        let Frame { event, data } = self;
        serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload { event, source })
    }
}

// ========================================
// Payloads
// ========================================

/// Handshake payload carrying the server-assigned session id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectPayload {
    pub sid: String,
}

/// Latest status of one user within one group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub user_id: String,
    pub group_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Group metadata change (name etc.)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdatePayload {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Member descriptor inside a member list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Full member list of a group (replaces any previous list)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdatePayload {
    pub group_id: String,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
}

// ========================================
// Events
// ========================================

/// Events pushed from the server to the client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connect(ConnectPayload),
    StatusUpdate(StatusUpdatePayload),
    GroupUpdate(GroupUpdatePayload),
    MemberUpdate(MemberUpdatePayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connect(_) => EVENT_CONNECT,
            ServerEvent::StatusUpdate(_) => EVENT_STATUS_UPDATE,
            ServerEvent::GroupUpdate(_) => EVENT_GROUP_UPDATE,
            ServerEvent::MemberUpdate(_) => EVENT_MEMBER_UPDATE,
        }
    }

    /// Decode a text frame received from the server
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame = Frame::parse(text)?;
        match frame.event.as_str() {
            EVENT_CONNECT => frame.payload().map(ServerEvent::Connect),
            EVENT_STATUS_UPDATE => frame.payload().map(ServerEvent::StatusUpdate),
            EVENT_GROUP_UPDATE => frame.payload().map(ServerEvent::GroupUpdate),
            EVENT_MEMBER_UPDATE => frame.payload().map(ServerEvent::MemberUpdate),
            _ => Err(ProtocolError::UnknownEvent(frame.event)),
        }
    }

    /// Encode into a text frame
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match self {
            ServerEvent::Connect(payload) => Frame::encode(self.name(), payload),
            ServerEvent::StatusUpdate(payload) => Frame::encode(self.name(), payload),
            ServerEvent::GroupUpdate(payload) => Frame::encode(self.name(), payload),
            ServerEvent::MemberUpdate(payload) => Frame::encode(self.name(), payload),
        }
    }
}

/// Events sent from the client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    JoinRoom(String),
    LeaveRoom(String),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => EVENT_JOIN_ROOM,
            ClientEvent::LeaveRoom(_) => EVENT_LEAVE_ROOM,
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            ClientEvent::JoinRoom(group_id) | ClientEvent::LeaveRoom(group_id) => group_id,
        }
    }

    /// Decode a text frame received from a client
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame = Frame::parse(text)?;
        match frame.event.as_str() {
            EVENT_JOIN_ROOM => frame.payload().map(ClientEvent::JoinRoom),
            EVENT_LEAVE_ROOM => frame.payload().map(ClientEvent::LeaveRoom),
            _ => Err(ProtocolError::UnknownEvent(frame.event)),
        }
    }

    /// Encode into a text frame
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Frame::encode(self.name(), &self.group_id())
    }
}

// ========================================
// Long-polling transport
// ========================================

/// Response of `GET /poll/open`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOpenResponse {
    pub sid: String,
}

/// Response of `GET /poll?sid=...`
///
/// `closed` is set when the server ended the session on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PollResponse {
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default)]
    pub closed: bool,
}

// ========================================
// REST bodies
// ========================================

/// Body of `POST /api/groups/{group_id}/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

/// Body of `POST /api/groups/{group_id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRenameRequest {
    pub name: String,
}

/// Item of `GET /api/groups`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub member_count: usize,
}
