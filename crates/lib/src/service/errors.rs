//! HTTP service error types.

use thiserror::Error;

/// Errors from running the conflict HTTP service.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Server start requested while already running.
    #[error("Server already running on {address}")]
    ServerAlreadyRunning { address: String },

    /// Server failed to bind its address.
    #[error("Failed to bind {address}: {reason}")]
    ServerBind { address: String, reason: String },

    /// Operation requires a running server.
    #[error("Server is not running")]
    ServerNotRunning,
}

impl ServiceError {
    /// Check if this error means the server was not running.
    pub fn is_not_running(&self) -> bool {
        matches!(self, ServiceError::ServerNotRunning)
    }
}
