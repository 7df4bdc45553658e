//! HTTP surface for the conflict API.
//!
//! Runs the axum router from [`http`] on a spawned task with graceful
//! shutdown. Binding port 0 is supported; the actually bound address is
//! reported back through [`ConflictService::address`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::Result;
use crate::conflict::ConflictResolver;

mod errors;
mod http;

pub use errors::ServiceError;
pub use http::{AppState, router};

/// Owns the conflict API server lifecycle.
///
/// Owned exclusively by the host; all operations take `&mut self`, so no
/// internal locking is needed.
pub struct ConflictService {
    resolver: Arc<ConflictResolver>,
    /// Shutdown signal for the running server, if any.
    shutdown: Option<oneshot::Sender<()>>,
    address: Option<SocketAddr>,
}

impl ConflictService {
    pub fn new(resolver: Arc<ConflictResolver>) -> Self {
        Self {
            resolver,
            shutdown: None,
            address: None,
        }
    }

    /// Whether the server is currently running.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// The bound address of the running server.
    pub fn address(&self) -> Result<SocketAddr> {
        self.address.ok_or_else(|| ServiceError::ServerNotRunning.into())
    }

    /// Starts serving on `addr`, returning the actually bound address.
    pub async fn start(&mut self, addr: &str) -> Result<SocketAddr> {
        if self.is_running() {
            return Err(ServiceError::ServerAlreadyRunning {
                address: addr.to_string(),
            }
            .into());
        }
        let socket_addr: SocketAddr = addr.parse().map_err(|e| ServiceError::ServerBind {
            address: addr.to_string(),
            reason: format!("Invalid address: {e}"),
        })?;

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ServiceError::ServerBind {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        let actual_addr = listener
            .local_addr()
            .map_err(|e| ServiceError::ServerBind {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;

        let app = router(AppState {
            resolver: self.resolver.clone(),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                tracing::error!(%err, "conflict API server failed");
            }
        });

        tracing::info!(%actual_addr, "conflict API listening");
        self.shutdown = Some(shutdown_tx);
        self.address = Some(actual_addr);
        Ok(actual_addr)
    }

    /// Signals the server to shut down gracefully.
    pub fn stop(&mut self) -> Result<()> {
        let Some(tx) = self.shutdown.take() else {
            return Err(ServiceError::ServerNotRunning.into());
        };
        let _ = tx.send(());
        self.address = None;
        Ok(())
    }
}
