//! Cinder development server.
//!
//! Serves built wasm units next to the web application during development.
//!
//! # Architecture
//!
//! The server consists of:
//! - **Interceptor**: Answers artifact and unit asset requests from disk
//! - **Routes**: Virtual modules, health, unit listing and static files
//! - **Watcher**: Rebuilds units when their sources change

pub mod error;
pub mod interceptor;
pub mod routes;
pub mod watcher;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cinder_core::{BuildContext, Mode};

pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use watcher::{PendingSet, UnitWatcher, WatchMap};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Serve a finished build cycle until Ctrl+C.
///
/// In development, units are rebuilt on change when the project sets
/// `watch_debounce_ms`.
pub async fn serve(ctx: Arc<BuildContext>, config: ServerConfig) -> ServerResult<()> {
    let app = create_router(ctx.clone());

    let watcher_task = match ctx.config().watch_debounce_ms {
        Some(ms) if ctx.mode() == Mode::Development => {
            let watcher = UnitWatcher::new(&ctx, Duration::from_millis(ms))?;
            Some(tokio::spawn(watcher.run(ctx.clone())))
        }
        _ => None,
    };

    // Build address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", config.host, config.port)))?;

    tracing::info!("Starting Cinder server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });

    server.await?;

    if let Some(task) = watcher_task {
        task.abort();
        let _ = task.await;
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
    }
}
