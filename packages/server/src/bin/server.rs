//! Development relay server for the Kibun presence client.
//!
//! Keeps group rooms in memory, fans status updates out to every session in a
//! room and speaks both the WebSocket and the long-polling transport.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kibun-server
//! cargo run --bin kibun-server -- --host 0.0.0.0 --port 3000
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use kibun_server::{
    infrastructure::{
        message_pusher::ChannelMessagePusher, repository::InMemoryPresenceRepository,
    },
    ui::Server,
    usecase::UseCases,
};
use kibun_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "kibun-server")]
#[command(about = "Development relay server for Kibun group presence", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "3000")]
    port: u16,

    /// Seconds a long-polling request waits for frames
    #[arg(long, default_value = "25")]
    poll_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Create Repository (in-memory database)
    let repository = Arc::new(InMemoryPresenceRepository::new());

    // 2. Create MessagePusher (one channel per session, any transport)
    let message_pusher = Arc::new(ChannelMessagePusher::new());

    // 3. Create UseCases
    let usecases = UseCases::new(repository, message_pusher, Arc::new(SystemClock));

    // 4. Create and run the server
    let server = Server::new(usecases, Duration::from_secs(args.poll_timeout_secs));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
