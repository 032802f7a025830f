//! Panic recovery responses, the streaming-body guard and the optional
//! panic hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::response::IntoResponse;
use axum::Json;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use hyper::body::{Frame, SizeHint};
use janus_core::context::RequestContext;
use janus_core::topology::Protocol;
use janus_core::GRPC_CONTENT_TYPE;
use tonic::Status;
use tracing::{error, warn, Span};

/// Message returned to callers whose handler panicked.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Generic internal-error response in the caller's protocol.
pub(crate) fn internal_error(protocol: Protocol) -> Response<Body> {
    match protocol {
        Protocol::Grpc => grpc_error(&Status::internal(INTERNAL_ERROR_MESSAGE)),
        Protocol::Rest => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "message": INTERNAL_ERROR_MESSAGE })),
        )
            .into_response(),
    }
}

/// Trailers-only gRPC response carrying `status`.
pub(crate) fn grpc_error(status: &Status) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(GRPC_CONTENT_TYPE));
    if let Err(e) = status.add_header(headers) {
        warn!(error = %e, "failed to encode grpc status headers");
    }
    response
}

/// Trailers ending a gRPC stream whose body panicked.
fn internal_trailers() -> HeaderMap {
    let mut trailers = HeaderMap::new();
    if let Err(e) = Status::internal(INTERNAL_ERROR_MESSAGE).add_header(&mut trailers) {
        warn!(error = %e, "failed to encode grpc status trailers");
    }
    trailers
}

// =============================================================================
// Streaming Body Guard
// =============================================================================

/// Response body that keeps catching panics after the handler returned.
///
/// Streamed bodies (gRPC server streams, `Body::from_stream`) are polled by
/// hyper long after the handler future completed. A panic there is logged
/// with the call's IDs inside its span, then:
/// - gRPC: the stream ends with `grpc-status: 13` trailers
/// - REST: the body fails, so hyper aborts the response (headers are
///   already on the wire and cannot turn into a 500)
pub(crate) struct RecoveringBody {
    inner: Body,
    ctx: RequestContext,
    protocol: Protocol,
    span: Span,
    finished: bool,
}

impl RecoveringBody {
    pub(crate) fn new(inner: Body, ctx: RequestContext, protocol: Protocol, span: Span) -> Self {
        Self {
            inner,
            ctx,
            protocol,
            span,
            finished: false,
        }
    }
}

impl HttpBody for RecoveringBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let _entered = this.span.enter();
        let inner = &mut this.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll_frame(cx))) {
            Ok(poll) => poll,
            Err(payload) => {
                this.finished = true;
                error!(
                    request_id = this.ctx.request_id(),
                    correlation_id = this.ctx.correlation_id(),
                    panic = %panic_message(payload.as_ref()),
                    backtrace = %Backtrace::capture(),
                    "recovered from panic while streaming response body"
                );
                match this.protocol {
                    Protocol::Grpc => Poll::Ready(Some(Ok(Frame::trailers(internal_trailers())))),
                    Protocol::Rest => Poll::Ready(Some(Err(axum::Error::new(INTERNAL_ERROR_MESSAGE)))),
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        if self.finished {
            SizeHint::with_exact(0)
        } else {
            self.inner.size_hint()
        }
    }
}

/// Logs every panic through `tracing` with its location and a backtrace.
///
/// The event is emitted on the panicking thread, inside the request span,
/// so it carries the request and correlation IDs. Replaces the default
/// stderr hook; call once from `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            panic = %panic_message(info.payload()),
            location = %location,
            backtrace = %Backtrace::force_capture(),
            "panic"
        );
    }));
}
