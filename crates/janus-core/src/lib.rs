//! # janus-core: Pure Host Logic for Janus
//!
//! Everything the service host decides without touching a socket.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Janus Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Service (REST router + gRPC services)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        janus-host: listeners, multiplexer, interceptors         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ janus-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐ ┌────────┐  │   │
//! │  │   │  config  │ │ topology │ │ context  │ │ error │ │validate│  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO SOCKETS • NO FILES • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Endpoint configuration and the settings-string parser
//! - [`topology`] - Listener topology resolution
//! - [`context`] - Per-call request/correlation IDs
//! - [`error`] - Config, validation and per-request errors
//! - [`validation`] - `Validate` trait and the format registry
//!
//! ## Feature Flags
//!
//! - `tonic`: `AppError` → `tonic::Status`, `RequestContext::from_grpc`
//! - `axum`: `AppError: IntoResponse`, `RequestContext` extractor
//!
//! ## Example Usage
//!
//! ```rust
//! use janus_core::config::ServiceEndpointConfig;
//! use janus_core::topology::ListenTopology;
//!
//! let config = ServiceEndpointConfig::new("0.0.0.0").with_shared_port(8080);
//! assert_eq!(config.validate(), Ok(ListenTopology::SharedPort { port: 8080 }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod context;
pub mod error;
pub mod topology;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ServiceEndpointConfig;
pub use context::{RequestContext, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
pub use error::{AppError, AppResult, ConfigError, ErrorKind, ValidationError};
pub use topology::{ListenTopology, Protocol};
pub use validation::{FormatRegistry, Validate, ValidationResult};

/// Content type prefix identifying gRPC requests.
pub const GRPC_CONTENT_TYPE: &str = "application/grpc";
