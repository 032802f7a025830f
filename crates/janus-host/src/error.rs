//! # Host Errors
//!
//! Failures that stop the host. Per-request problems never appear here;
//! they are answered at the interceptor boundary.
//!
//! ## Error Categories
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Configuration  │ Config          │ Fatal before binding      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Transport      │ Tls, Bind,      │ Fatal, the process cannot │
//! │                │ Transport, Io   │ serve without a listener  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Runtime        │ Task            │ A listener task panicked  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::io;

use janus_core::error::ConfigError;
use thiserror::Error;

/// Errors raised while building, binding or running the host.
#[derive(Debug, Error)]
pub enum HostError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Endpoint configuration or executor registration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Certificate, key or CA could not be loaded.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A listener could not be bound.
    ///
    /// ## When This Occurs
    /// - Port already in use
    /// - Host does not resolve
    /// - Privileged port without permission
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The dedicated gRPC server failed.
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Other socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// A listener task panicked or was cancelled unexpectedly.
    #[error("listener task failed: {0}")]
    Task(String),
}

impl HostError {
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// True for errors detected before any listener was opened.
    pub fn is_config_error(&self) -> bool {
        matches!(self, HostError::Config(_) | HostError::Tls(_))
    }

    /// True for listener and socket failures.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            HostError::Tls(_) | HostError::Bind { .. } | HostError::Transport(_) | HostError::Io(_)
        )
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err: HostError = ConfigError::NoPortsEnabled.into();
        assert!(err.is_config_error());
        assert!(!err.is_transport_error());

        let err = HostError::Bind {
            address: "127.0.0.1:80".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.is_transport_error());
        assert_eq!(err.to_string(), "failed to bind 127.0.0.1:80: in use");

        assert!(HostError::tls("bad key").is_transport_error());
    }
}
