//! Request-context extraction and response annotation.

use http::header::HeaderValue;
use http::HeaderMap;
use janus_core::context::{RequestContext, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
use janus_core::topology::Protocol;

/// Builds the call's context from inbound headers.
///
/// gRPC metadata that is present but not readable is an error (the name of
/// the offending key is returned). REST requests treat it as absent.
pub(crate) fn extract(headers: &HeaderMap, protocol: Protocol) -> Result<RequestContext, &'static str> {
    let request_id = read(headers, REQUEST_ID_HEADER);
    let correlation_id = read(headers, CORRELATION_ID_HEADER);
    match protocol {
        Protocol::Grpc => Ok(RequestContext::from_inbound(request_id?, correlation_id?)),
        Protocol::Rest => Ok(RequestContext::from_inbound(
            request_id.ok().flatten(),
            correlation_id.ok().flatten(),
        )),
    }
}

fn read<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, &'static str> {
    match headers.get(name) {
        Some(value) => value.to_str().map(Some).map_err(|_| name),
        None => Ok(None),
    }
}

/// Echoes the IDs on the response so callers can correlate.
pub(crate) fn annotate(headers: &mut HeaderMap, ctx: &RequestContext) {
    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Some(Ok(value)) = ctx.correlation_id().map(HeaderValue::from_str) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
}
