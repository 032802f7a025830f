//! # janus-host: Dual-Protocol Service Host
//!
//! Serves one service over REST (axum) and gRPC (tonic), on one shared port
//! or on two, behind a common interceptor chain.
//!
//! ## Module Organization
//!
//! - [`lifecycle`] - `ServiceHost`: build, bind, serve, graceful shutdown
//! - [`multiplex`] - Per-request routing between the two stacks
//! - [`interceptor`] - Request context, panic recovery, payload validation
//! - [`tls`] - Certificate loading and rustls configuration
//! - [`shutdown`] - Signal handling and shutdown fan-out
//! - [`error`] - Host error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use janus_core::ServiceEndpointConfig;
//! use janus_host::ServiceHost;
//!
//! let config = ServiceEndpointConfig::new("0.0.0.0").with_shared_port(8080);
//! ServiceHost::builder(config)
//!     .rest(router)
//!     .grpc(Routes::new(NoteServiceServer::new(service)))
//!     .build()?
//!     .serve()
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
mod grpc;
pub mod interceptor;
pub mod lifecycle;
pub mod multiplex;
mod serve;
pub mod shutdown;
pub mod tls;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{HostError, HostResult};
pub use interceptor::{install_panic_hook, InterceptorLayer, ValidatedJson, ValidatingCodec};
pub use lifecycle::{BoundHost, RestApi, ServiceHost, ServiceHostBuilder};
pub use multiplex::{is_grpc_request, Multiplexer};
pub use shutdown::{shutdown_signal, Shutdown, ShutdownTrigger};
pub use tls::TlsMaterial;
