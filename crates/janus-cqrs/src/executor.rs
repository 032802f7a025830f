//! # Executors
//!
//! A command or query object that knows how to run itself once the invoker
//! hands it its dependencies.
//!
//! ```text
//! struct GetNote { id }            ── the request (owned by the caller)
//!   type Deps   = NoteStore        ── looked up by TypeId at invoke time
//!   type Output = Note
//!   const KIND  = Query
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use janus_core::context::RequestContext;
use janus_core::error::AppResult;

/// Whether an executor changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Command,
    Query,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Command => write!(f, "command"),
            ExecutorKind::Query => write!(f, "query"),
        }
    }
}

/// A dispatchable command or query.
#[async_trait]
pub trait Executor: Send + Sized + 'static {
    /// Dependency bundle shared by every invocation of this executor.
    type Deps: Send + Sync + 'static;

    /// Success value.
    type Output: Send + 'static;

    const KIND: ExecutorKind = ExecutorKind::Command;

    /// Stable tag used in logs and registration errors.
    fn tag() -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn execute(self, deps: Arc<Self::Deps>, ctx: &RequestContext) -> AppResult<Self::Output>;
}
