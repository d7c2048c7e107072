//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::UseCases;

use super::{
    handler::{
        close_polling, get_group_members, get_groups, health_check, kick_session, open_polling,
        poll, post_status, rename_group, send_polling, spawn_idle_reaper, websocket_handler,
    },
    signal::shutdown_signal,
    state::{AppState, PollingSessions},
};

/// Default time a `GET /poll` request waits for frames
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Presence relay server
///
/// # Example
///
/// ```ignore
/// let usecases = UseCases::new(repository, message_pusher, clock);
/// let server = Server::new(usecases, DEFAULT_POLL_TIMEOUT);
/// server.run("127.0.0.1".to_string(), 3000).await?;
/// ```
pub struct Server {
    /// UseCases（全ユースケース）
    usecases: UseCases,
    /// long-polling リクエストの最大待ち時間
    poll_timeout: Duration,
}

impl Server {
    /// Create a new Server instance
    pub fn new(usecases: UseCases, poll_timeout: Duration) -> Self {
        Self {
            usecases,
            poll_timeout,
        }
    }

    fn into_state(self) -> Arc<AppState> {
        Arc::new(AppState {
            usecases: self.usecases,
            polling: PollingSessions::default(),
            poll_timeout: self.poll_timeout,
        })
    }

    /// Build the router with every endpoint
    fn router(app_state: Arc<AppState>) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // long-polling エンドポイント
            .route("/poll/open", get(open_polling))
            .route("/poll", get(poll).post(send_polling).delete(close_polling))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/groups", get(get_groups))
            .route("/api/groups/{group_id}", post(rename_group))
            .route("/api/groups/{group_id}/members", get(get_group_members))
            .route("/api/groups/{group_id}/status", post(post_status))
            .route("/api/sessions/{session_id}/disconnect", post(kick_session))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 3000)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Presence server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws or http://{}/poll", bind_addr, bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app_state = self.into_state();
        let reaper = spawn_idle_reaper(app_state.clone());

        let result = axum::serve(listener, Self::router(app_state))
            .with_graceful_shutdown(shutdown)
            .await;

        reaper.abort();
        result
    }
}
