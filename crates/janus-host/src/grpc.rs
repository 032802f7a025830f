//! gRPC plumbing.
//!
//! - [`serve_grpc`]: dedicated tonic listener (gRPC-only and dual-port
//!   topologies).
//! - [`GrpcRoutes`]: the same routes as a hyper-facing service, for the
//!   shared-port topology where they sit behind the
//!   [`Multiplexer`](crate::multiplex::Multiplexer) on the hyper accept loop.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::BoxError;
use http::{Request, Response};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;
use tonic::transport::{Server, ServerTlsConfig};
use tonic::Status;
use tower::{Service, ServiceExt};
use tracing::{error, info};

use crate::error::HostResult;
use crate::interceptor::recovery::grpc_error;
use crate::interceptor::InterceptorLayer;
use crate::serve::ServeOptions;
use crate::shutdown::Shutdown;

/// Status message when the routes themselves fail (not a handler error).
const ROUTING_ERROR_MESSAGE: &str = "gRPC routing failed";

/// tonic [`Routes`] over any request body, with infallible responses.
///
/// Routes only accept tonic's boxed body and may fail with a transport
/// error; hyper hands over `Incoming` and the REST side never fails. The
/// body is boxed on the way in and a routing failure becomes a
/// trailers-only `Internal` response.
#[derive(Debug, Clone)]
pub(crate) struct GrpcRoutes {
    routes: Routes,
}

impl GrpcRoutes {
    pub(crate) fn new(routes: Routes) -> Self {
        Self { routes }
    }
}

impl<B> Service<Request<B>> for GrpcRoutes
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let routes = self.routes.clone();
        let req = req.map(tonic::body::boxed);
        Box::pin(async move {
            match routes.oneshot(req).await {
                Ok(response) => Ok(response.map(Body::new)),
                Err(e) => {
                    let e: BoxError = e.into();
                    error!(error = %e, "gRPC routes failed");
                    Ok(grpc_error(&Status::internal(ROUTING_ERROR_MESSAGE)))
                }
            }
        })
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

/// Runs a tonic server on `listener` until `shutdown` fires.
///
/// tonic stops accepting and lets in-flight calls finish once the shutdown
/// future resolves; the coordinator bounds how long that may take.
pub(crate) async fn serve_grpc(
    listener: TcpListener,
    routes: Routes,
    tls: Option<ServerTlsConfig>,
    options: ServeOptions,
    mut shutdown: Shutdown,
) -> HostResult<()> {
    let local_addr = listener.local_addr()?;

    let mut server = Server::builder()
        .tcp_nodelay(true)
        .tcp_keepalive(non_zero(options.keep_alive))
        .http2_keepalive_interval(non_zero(options.keep_alive))
        .http2_keepalive_timeout(non_zero(options.idle_timeout))
        .http2_max_header_list_size(u32::try_from(options.max_header_size).unwrap_or(u32::MAX));
    if let Some(timeout) = non_zero(options.write_timeout) {
        server = server.timeout(timeout);
    }
    let secure = tls.is_some();
    if let Some(tls) = tls {
        server = server.tls_config(tls)?;
    }

    info!(%local_addr, tls = secure, "gRPC listener started");
    server
        .layer(InterceptorLayer::new())
        .add_routes(routes)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.wait().await
        })
        .await?;
    info!(%local_addr, "gRPC listener stopped");
    Ok(())
}
