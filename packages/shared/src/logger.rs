//! Logging setup utilities for the Kibun binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the workspace crates and the calling binary. The level
/// can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "kibun-server", "kibun-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use kibun_shared::logger::setup_logger;
///
/// setup_logger("kibun-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    ["kibun_shared", "kibun_client", "kibun_server", &binary_target]
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}
