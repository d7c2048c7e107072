//! Terminal presence client.
//!
//! Connects to a Kibun presence server, joins the room of the selected group
//! and prints status, mood and member updates as they arrive. Reconnects
//! automatically with exponential backoff.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kibun-client -- --token alice --group team-a
//! cargo run --bin kibun-client -- -t bob --platform emulator --transport websocket
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use kibun_client::{
    ClientConfig, ClientOptions, Platform, ReconnectPolicy, TransportKind,
    model::{GroupId, UserId},
};
use kibun_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kibun-client")]
#[command(about = "Terminal client for Kibun group presence", long_about = None)]
struct Args {
    /// Bearer token (the development server uses it as the user id)
    #[arg(short = 't', long)]
    token: String,

    /// User id shown as "me" (defaults to the token)
    #[arg(short = 'u', long)]
    user_id: Option<String>,

    /// Server base URL (defaults to the platform's endpoint)
    #[arg(short = 'e', long)]
    endpoint: Option<String>,

    /// Where the client runs: device or emulator
    #[arg(long, default_value = "device")]
    platform: Platform,

    /// Transports in order of preference (repeatable)
    #[arg(long = "transport", value_delimiter = ',', default_values = ["polling", "websocket"])]
    transports: Vec<TransportKind>,

    /// Group to select on start (defaults to the saved selection)
    #[arg(short = 'g', long)]
    group: Option<String>,

    /// Preferences file (in-memory when omitted)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Maximum consecutive reconnection attempts
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Base reconnection delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    /// Maximum reconnection delay in milliseconds
    #[arg(long, default_value_t = 5000)]
    max_delay_ms: u64,
}

impl Args {
    fn into_options(self) -> Result<ClientOptions, Box<dyn std::error::Error>> {
        let mut config = ClientConfig::for_platform(self.platform)
            .with_transports(self.transports)
            .with_reconnect(ReconnectPolicy {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
            });
        if let Some(endpoint) = self.endpoint {
            config = config.with_endpoint(endpoint);
        }

        let user_id = UserId::new(self.user_id.unwrap_or_else(|| self.token.clone()))?;
        let group = self.group.map(GroupId::new).transpose()?;

        Ok(ClientOptions {
            user_id,
            token: self.token,
            config,
            preferences_path: self.prefs,
            group,
        })
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let options = match Args::parse().into_options() {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("Invalid arguments: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = kibun_client::run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
