//! Kibun development relay server.
//!
//! Layered the same way as a production deployment would be:
//!
//! - `domain`: value objects, entities and the repository / pusher traits
//! - `infrastructure`: in-memory repository, channel-based pusher, payload conversion
//! - `usecase`: one struct per server operation
//! - `ui`: axum router, WebSocket / long-polling / REST handlers

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
