//! HTTP / WebSocket / long-polling surface of the relay server.

mod auth;
mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
