//! Gateway startup helper for embedding in the host process.
//!
//! Provides [`spawn_gateway`] which launches the WebSocket server on a
//! background Tokio task alongside the registry's rate-counter
//! sweeper. The host binary calls this during startup so the gateway
//! runs concurrently with the tick loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::server::{ServerConfig, ServerError};

/// Errors that can occur when spawning the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the gateway server on a background Tokio task.
///
/// Also spawns the session registry's once-a-minute rate-counter
/// sweep. Returns the server task's [`JoinHandle`] so the caller can
/// manage its lifecycle alongside the tick loop; the sweeper task ends
/// with the runtime.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse. Bind failures surface asynchronously from the spawned task
/// and are logged there.
pub async fn spawn_gateway(
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
) -> Result<JoinHandle<()>, StartupError> {
    // Catch obvious misconfigurations before spawning; the actual bind
    // happens inside start_server.
    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str.parse().map_err(|e| {
        StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}")))
    })?;

    let sweeper = dispatcher.sessions().spawn_sweeper();
    drop(sweeper);

    let port = config.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, dispatcher).await {
            tracing::error!(error = %e, "gateway server exited with error");
        }
    });

    tracing::info!(port, "gateway spawned on background task");

    Ok(handle)
}
