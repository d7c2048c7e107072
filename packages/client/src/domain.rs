//! Domain logic for the connection lifecycle.
//!
//! This module contains pure functions that implement the reconnection
//! decisions without side effects, making them easy to test.

use std::{fmt, time::Duration};

use crate::{config::ReconnectPolicy, error::ClientError};

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called locally
    ClientDisconnect,
    /// The server closed the session on purpose
    ServerDisconnect,
    /// The underlying stream ended without a close handshake
    TransportClose,
    /// The underlying stream failed
    TransportError(String),
}

impl DisconnectReason {
    /// Reason code surfaced with the disconnected event
    pub fn code(&self) -> &'static str {
        match self {
            DisconnectReason::ClientDisconnect => "client disconnect",
            DisconnectReason::ServerDisconnect => "server disconnect",
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::TransportError(_) => "transport error",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::TransportError(detail) => write!(f, "{}: {}", self.code(), detail),
            _ => f.write_str(self.code()),
        }
    }
}

/// What the connection loop does after a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Stop; the handle is torn down
    Stop,
    /// Reconnect right away without waiting
    Immediate,
    /// Go through the backoff schedule
    Backoff,
}

/// Decide how to react to the end of a session.
///
/// A local disconnect stops the loop. A server-initiated disconnect is
/// answered with an immediate reconnect attempt. Anything else goes through
/// the regular backoff schedule.
pub fn reconnect_action(reason: &DisconnectReason) -> ReconnectAction {
    match reason {
        DisconnectReason::ClientDisconnect => ReconnectAction::Stop,
        DisconnectReason::ServerDisconnect => ReconnectAction::Immediate,
        DisconnectReason::TransportClose | DisconnectReason::TransportError(_) => {
            ReconnectAction::Backoff
        }
    }
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `current_attempt` - Consecutive failed attempts so far (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(current_attempt: u32, max_attempts: u32) -> bool {
    current_attempt < max_attempts
}

/// Errors that retrying cannot fix
pub fn should_give_up(error: &ClientError) -> bool {
    matches!(error, ClientError::Unauthorized | ClientError::Config(_))
}

/// Delay before the reconnection attempt number `attempt` (0-indexed).
///
/// `base * 2^attempt`, capped at `max_delay`.
pub fn backoff_delay(policy: &ReconnectPolicy, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    policy
        .base_delay
        .checked_mul(factor)
        .map_or(policy.max_delay, |delay| delay.min(policy.max_delay))
}
