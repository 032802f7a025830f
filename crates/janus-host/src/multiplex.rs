//! # Protocol Multiplexer
//!
//! Splits one listener's traffic between the gRPC and REST stacks.
//!
//! ```text
//! request ──► version == HTTP/2 && content-type starts with application/grpc ?
//!                 │ yes                                 │ no
//!                 ▼                                     ▼
//!            gRPC stack                             REST stack
//! ```
//!
//! The decision is made per request: one HTTP/2 connection may carry both
//! kinds of traffic. The path is never consulted.

use std::task::{Context, Poll};

use futures::future::Either;
use http::header::CONTENT_TYPE;
use http::{Request, Version};
use janus_core::GRPC_CONTENT_TYPE;
use tower::util::Oneshot;
use tower::{Service, ServiceExt};

/// True when `req` must be served by the gRPC stack.
pub fn is_grpc_request<B>(req: &Request<B>) -> bool {
    req.version() == Version::HTTP_2
        && req
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.as_bytes().starts_with(GRPC_CONTENT_TYPE.as_bytes()))
            .unwrap_or(false)
}

/// Routes each request to `rest` or `grpc`.
///
/// Both sub-services are expected to be always ready (axum routers, tonic
/// routes and the interceptor are); each call works on a clone.
#[derive(Debug, Clone)]
pub struct Multiplexer<R, G> {
    rest: R,
    grpc: G,
}

impl<R, G> Multiplexer<R, G> {
    pub fn new(rest: R, grpc: G) -> Self {
        Self { rest, grpc }
    }
}

impl<R, G, B> Service<Request<B>> for Multiplexer<R, G>
where
    R: Service<Request<B>> + Clone,
    G: Service<Request<B>, Response = R::Response, Error = R::Error> + Clone,
{
    type Response = R::Response;
    type Error = R::Error;
    type Future = Either<Oneshot<R, Request<B>>, Oneshot<G, Request<B>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        if is_grpc_request(&req) {
            Either::Right(self.grpc.clone().oneshot(req))
        } else {
            Either::Left(self.rest.clone().oneshot(req))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::Response;
    use std::convert::Infallible;
    use tower::service_fn;

    fn tagged(tag: &'static str) -> impl Fn(Request<Body>) -> std::future::Ready<Result<Response<Body>, Infallible>> + Clone {
        move |_req| std::future::ready(Ok(Response::new(Body::from(tag))))
    }

    fn request(version: Version, content_type: Option<&str>, path: &str) -> Request<Body> {
        let mut builder = Request::post(path).version(version);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn route(req: Request<Body>) -> String {
        let mux = Multiplexer::new(service_fn(tagged("rest")), service_fn(tagged("grpc")));
        let response = mux.oneshot(req).await.unwrap();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_http2_grpc_goes_to_grpc() {
        for ct in ["application/grpc", "application/grpc+proto", "application/grpc-web"] {
            assert_eq!(route(request(Version::HTTP_2, Some(ct), "/svc/Method")).await, "grpc");
        }
    }

    #[tokio::test]
    async fn test_everything_else_goes_to_rest() {
        assert_eq!(route(request(Version::HTTP_2, Some("application/json"), "/v1/notes")).await, "rest");
        assert_eq!(route(request(Version::HTTP_2, None, "/v1/notes")).await, "rest");
        assert_eq!(route(request(Version::HTTP_11, Some("application/grpc"), "/svc/Method")).await, "rest");
        assert_eq!(route(request(Version::HTTP_10, Some("application/grpc"), "/svc/Method")).await, "rest");
    }

    #[tokio::test]
    async fn test_path_is_ignored() {
        // A gRPC-looking path with a JSON body is REST; a REST-looking path
        // with a gRPC content type over HTTP/2 is gRPC.
        assert_eq!(
            route(request(Version::HTTP_2, Some("application/json"), "/janus.demo.v1.NoteService/GetNote")).await,
            "rest"
        );
        assert_eq!(
            route(request(Version::HTTP_2, Some("application/grpc"), "/v1/notes")).await,
            "grpc"
        );
    }

    #[test]
    fn test_content_type_must_start_with_grpc() {
        assert!(!is_grpc_request(&request(Version::HTTP_2, Some("text/application/grpc"), "/")));
    }
}
