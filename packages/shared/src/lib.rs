//! Code shared by the Kibun presence client and the development relay server.
//!
//! - `protocol`: wire frames exchanged over every transport
//! - `time`: clock abstraction and RFC 3339 helpers
//! - `logger`: tracing subscriber setup for the binaries

pub mod logger;
pub mod protocol;
pub mod time;
