//! # janus-cqrs: Command/Query Invoker for Janus
//!
//! Decouples request handling from handler implementations: transports
//! build a command or query value, the [`Invoker`] finds the dependencies
//! registered for its type and runs it under a per-call timeout.
//!
//! ## Module Organization
//!
//! - [`executor`] - The `Executor` trait
//! - [`registry`] - Type-keyed dependency registry
//! - [`invoker`] - Dispatch with timeout and logging
//!
//! ## Usage
//!
//! ```rust,ignore
//! use janus_cqrs::{HandlerRegistry, Invoker};
//!
//! let mut registry = HandlerRegistry::new();
//! registry
//!     .bundle(Arc::new(NoteStore::default()))
//!     .with::<CreateNote>()?
//!     .with::<GetNote>()?;
//!
//! let invoker = Invoker::new(registry, Duration::from_secs(5));
//! let note = invoker.invoke(&ctx, GetNote { id }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod executor;
pub mod invoker;
pub mod registry;

// =============================================================================
// Re-exports
// =============================================================================

pub use executor::{Executor, ExecutorKind};
pub use invoker::{Invoker, MISSING_HANDLER_CODE, TIMEOUT_CODE};
pub use registry::{Bundle, HandlerRegistry};

// Executors implement the trait with this macro.
pub use async_trait::async_trait;
