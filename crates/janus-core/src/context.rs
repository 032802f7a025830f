//! # Request Context
//!
//! Per-call identity attached by the interceptor chain before any handler
//! code runs.
//!
//! ## Lifecycle
//! ```text
//! inbound headers / metadata
//!   Request-Id: abc        ──►  request_id      = "abc"
//!   (no Request-Id)        ──►  request_id      = fresh UUID v4
//!   Correlation-Id: xyz    ──►  correlation_id  = Some("xyz")
//!   (no Correlation-Id)    ──►  correlation_id  = None
//!
//! created once per unary call / stream open / REST request
//! never mutated, dropped when the call returns
//! ```

use uuid::Uuid;

/// Header (and gRPC metadata key) carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "request-id";

/// Header (and gRPC metadata key) carrying the optional correlation ID.
pub const CORRELATION_ID_HEADER: &str = "correlation-id";

/// Identity of one inbound call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestContext {
    request_id: String,
    correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, correlation_id: Option<String>) -> Self {
        Self {
            request_id: request_id.into(),
            correlation_id,
        }
    }

    /// Fresh context with a new UUID v4 request ID and no correlation ID.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), None)
    }

    /// Propagates the inbound IDs, generating a request ID when absent.
    ///
    /// Blank values count as absent.
    ///
    /// ## Example
    /// ```rust
    /// use janus_core::context::RequestContext;
    ///
    /// let ctx = RequestContext::from_inbound(Some("abc"), None);
    /// assert_eq!(ctx.request_id(), "abc");
    /// assert_eq!(ctx.correlation_id(), None);
    ///
    /// let generated = RequestContext::from_inbound(None, Some("trace-7"));
    /// assert_eq!(generated.request_id().len(), 36);
    /// assert_eq!(generated.correlation_id(), Some("trace-7"));
    /// ```
    pub fn from_inbound(request_id: Option<&str>, correlation_id: Option<&str>) -> Self {
        let request_id = match request_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let correlation_id = correlation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self {
            request_id,
            correlation_id,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

// =============================================================================
// Protocol Access
// =============================================================================

#[cfg(feature = "tonic")]
impl RequestContext {
    /// Context the interceptor attached to a gRPC request.
    ///
    /// ## Errors
    /// `Internal` "Unable to obtain metadata" when the call did not pass
    /// through the interceptor chain.
    pub fn from_grpc<T>(request: &tonic::Request<T>) -> Result<Self, tonic::Status> {
        request
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| tonic::Status::internal("Unable to obtain metadata"))
    }
}

#[cfg(feature = "axum")]
impl<S> axum::extract::FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = crate::error::AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| {
                crate::error::AppError::internal("Unable to obtain request context")
                    .with_code("MISSING_REQUEST_CONTEXT")
            })
    }
}
