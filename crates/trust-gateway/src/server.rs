//! TrustHub API server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::ProofVerifier;
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server plus the background services it owns.
///
/// The reconciliation service and the store health monitor are started by
/// [`start_background`](Self::start_background) and stopped by
/// [`stop_background`](Self::stop_background).
pub struct TrustHubServer<V> {
    state: Arc<AppState<V>>,
}

impl<V> Clone for TrustHubServer<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V: ProofVerifier> TrustHubServer<V> {
    /// Create a server from configuration.
    #[must_use]
    pub fn new(config: ServerConfig, verifier: V) -> Self {
        Self {
            state: Arc::new(AppState::new(config, verifier)),
        }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState<V>> {
        Arc::clone(&self.state)
    }

    /// Start reconciliation and the store heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the services are already running.
    pub async fn start_background(&self) -> GatewayResult<()> {
        self.state
            .sync()
            .start()
            .await
            .map_err(|e| GatewayError::internal(format!("reconciliation: {e}")))?;
        self.state.health().start();
        info!("background services started");
        Ok(())
    }

    /// Stop reconciliation and the store heartbeat.
    pub fn stop_background(&self) {
        self.state.sync().stop();
        self.state.health().stop();
        info!("background services stopped");
    }

    /// Serve the API until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> GatewayResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve the API until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::BindFailed(addr, e))?;
        let local = listener.local_addr().unwrap_or(addr);

        info!(addr = %local, environment = %self.state.config().server.environment, "TrustHub API listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::internal(e.to_string()))?;

        info!("TrustHub API shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
    }
}
