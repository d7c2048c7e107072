//! Request handlers.

mod frame;
mod http;
mod polling;
mod websocket;

pub use http::{
    get_group_members, get_groups, health_check, kick_session, post_status, rename_group,
};
pub use polling::{close_polling, open_polling, poll, send_polling, spawn_idle_reaper};
pub use websocket::websocket_handler;
