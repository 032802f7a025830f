//! # Interceptor Chain
//!
//! The fixed pipeline every REST request and every gRPC call passes through.
//!
//! ## Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inbound request                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. context    Request-Id / Correlation-Id → RequestContext extension   │
//! │       │        `request` span opened with both IDs                      │
//! │       │        unreadable gRPC metadata ──► Internal, handler skipped   │
//! │       ▼                                                                 │
//! │  2. recovery   catch_unwind around everything below                     │
//! │       │        panic ──► error log (IDs + backtrace) ──► 500 / Internal │
//! │       │        body panic ──► error log ──► status 13 trailers / abort  │
//! │       ▼                                                                 │
//! │  3. validation ValidatingCodec (gRPC) / ValidatedJson (REST)            │
//! │       │        invalid ──► InvalidArgument / 400, handler skipped       │
//! │       ▼                                                                 │
//! │  handler                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1 and 2 live in [`Interceptor`]; step 3 runs where the payload is
//! decoded (see [`validation`]), which is always inside step 2 and the
//! span opened by step 1.

pub(crate) mod context;
pub(crate) mod recovery;
pub mod validation;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes, HttpBody};
use axum::BoxError;
use futures::FutureExt;
use http::{Request, Response};
use janus_core::topology::Protocol;
use tonic::Status;
use tower::{Layer, Service};
use tracing::field::Empty;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::multiplex::is_grpc_request;

pub use recovery::{install_panic_hook, INTERNAL_ERROR_MESSAGE};
pub use validation::{ValidatedJson, ValidatingCodec, ValidatingDecoder};

/// Status message for gRPC calls whose metadata cannot be read.
pub const METADATA_ERROR_MESSAGE: &str = "Unable to obtain metadata";

/// Wraps a service in the interceptor chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptorLayer;

impl InterceptorLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = Interceptor<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Interceptor { inner }
    }
}

/// Service produced by [`InterceptorLayer`].
#[derive(Debug, Clone)]
pub struct Interceptor<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Interceptor<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let protocol = if is_grpc_request(&req) {
            Protocol::Grpc
        } else {
            Protocol::Rest
        };

        // 1. context
        let ctx = match context::extract(req.headers(), protocol) {
            Ok(ctx) => ctx,
            Err(header) => {
                warn!(header, path = %req.uri().path(), "rejecting gRPC call with unreadable metadata");
                let response = recovery::grpc_error(&Status::internal(METADATA_ERROR_MESSAGE));
                return Box::pin(async move { Ok::<_, S::Error>(response) });
            }
        };

        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            correlation_id = Empty,
            protocol = %protocol,
            method = %req.method(),
            path = %req.uri().path(),
        );
        if let Some(correlation_id) = ctx.correlation_id() {
            span.record("correlation_id", correlation_id);
        }
        req.extensions_mut().insert(ctx.clone());
        let body_span = span.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let started = Instant::now();

                // 2. recovery (3. validation happens inside the inner call)
                let outcome = AssertUnwindSafe(async move { inner.call(req).await })
                    .catch_unwind()
                    .await;

                let mut response = match outcome {
                    Ok(Ok(response)) => response.map(|body| {
                        Body::new(recovery::RecoveringBody::new(
                            Body::new(body),
                            ctx.clone(),
                            protocol,
                            body_span,
                        ))
                    }),
                    Ok(Err(e)) => return Err(e),
                    Err(payload) => {
                        error!(
                            request_id = ctx.request_id(),
                            correlation_id = ctx.correlation_id(),
                            panic = %recovery::panic_message(payload.as_ref()),
                            backtrace = %std::backtrace::Backtrace::capture(),
                            "recovered from handler panic"
                        );
                        recovery::internal_error(protocol)
                    }
                };

                context::annotate(response.headers_mut(), &ctx);
                debug!(
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request finished"
                );
                Ok(response)
            }
            .instrument(span),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
