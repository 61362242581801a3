//! HTTP server for filevault.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::WebConfig;

use super::handlers::AppState;
use super::router::create_router;

/// HTTP server bound to the configured host and port.
pub struct WebServer {
    host: String,
    port: u16,
    router: Router,
}

impl WebServer {
    pub fn new(config: &WebConfig, app_state: Arc<AppState>, public_prefix: &str) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            router: create_router(app_state, public_prefix, &config.cors_origins),
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Bind, serve in a background task, and return the bound address.
    ///
    /// Binding to port 0 picks a free port.
    pub async fn spawn(self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, self.router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
