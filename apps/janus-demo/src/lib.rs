//! # Janus Demo: Notes Service
//!
//! One set of executors served over REST and gRPC by the Janus host.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Notes Service                                   │
//! │                                                                         │
//! │  ┌────────────────────┐        ┌────────────────────┐                   │
//! │  │  NotesApi (axum)   │        │  NoteServiceImpl   │                   │
//! │  │                    │        │  (tonic)           │                   │
//! │  │ • POST /v1/notes   │        │ • CreateNote       │                   │
//! │  │ • GET /v1/notes/id │        │ • GetNote          │                   │
//! │  │                    │        │ • ImportNotes      │                   │
//! │  └─────────┬──────────┘        └─────────┬──────────┘                   │
//! │            └──────────────┬──────────────┘                              │
//! │                           ▼                                             │
//! │                  Invoker (janus-cqrs)                                   │
//! │                           ▼                                             │
//! │          CreateNote / GetNote / ImportNotes ──► NoteStore               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod notes;
pub mod rest;
pub mod services;
pub mod validation;

/// Generated protobuf types and gRPC stubs.
pub mod proto {
    tonic::include_proto!("janus.demo.v1");
}

use std::sync::Arc;
use std::time::Duration;

use janus_core::config::ServiceEndpointConfig;
use janus_core::error::ConfigError;
use janus_cqrs::{HandlerRegistry, Invoker};
use janus_host::{HostResult, ServiceHost};
use tonic::service::Routes;

use crate::notes::{CreateNote, GetNote, ImportNotes, NoteStore};
use crate::proto::note_service_server::NoteServiceServer;
use crate::rest::NotesApi;
use crate::services::note_service::NoteServiceImpl;

// Re-exports
pub use config::DemoConfig;
pub use error::{DemoError, DemoResult};

/// Registers every note executor against `store`.
///
/// ## Errors
/// [`ConfigError::DuplicateRegistration`] if an executor is already in
/// `registry`.
pub fn register_executors(registry: &mut HandlerRegistry, store: Arc<NoteStore>) -> Result<(), ConfigError> {
    registry
        .bundle(store)
        .with::<CreateNote>()?
        .with::<GetNote>()?
        .with::<ImportNotes>()?;
    Ok(())
}

/// Builds the invoker with all note executors registered.
pub fn build_invoker(store: Arc<NoteStore>, timeout: Duration) -> Result<Invoker, ConfigError> {
    let mut registry = HandlerRegistry::new();
    register_executors(&mut registry, store)?;
    Ok(Invoker::new(registry, timeout))
}

/// Wires both transports to `invoker` and builds the host.
pub fn build_host(endpoint: ServiceEndpointConfig, invoker: Invoker) -> HostResult<ServiceHost> {
    let grpc = Routes::new(NoteServiceServer::new(NoteServiceImpl::new(invoker.clone())));
    ServiceHost::builder(endpoint)
        .rest(NotesApi::new(invoker))
        .grpc(grpc)
        .build()
}
