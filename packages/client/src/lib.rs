//! Realtime group presence client.
//!
//! The core keeps one self-healing connection to the presence backend,
//! joins the room of the selected group, and merges server-pushed status,
//! mood and member updates into a shared group store.
//!
//! ## Layers
//!
//! - `connection` / `transport`: connection manager and its transports
//! - `room`: join/leave requests with deferred joins
//! - `dispatcher`: inbound events to store mutations
//! - `store`: shared group state read by UI layers
//! - `session`: composition root wiring the above together

pub mod api;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod model;
pub mod room;
pub mod runner;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;
mod ui;

pub use config::{ClientConfig, Platform, ReconnectPolicy, TransportKind};
pub use connection::{ConnectionEvent, ConnectionManager};
pub use error::ClientError;
pub use runner::{ClientOptions, run_client};
pub use session::{ConnectionStatus, PresenceClient};
