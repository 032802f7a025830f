//! # HTTP Accept Loop
//!
//! Serves one listener with hyper's auto connection builder, which speaks
//! HTTP/1.1 and HTTP/2 on the same socket (prior-knowledge h2c when there
//! is no TLS, ALPN `h2` when there is).
//!
//! ```text
//! loop {
//!     permit  = listen_limit.acquire()        (optional)
//!     stream  = listener.accept()
//!     spawn {
//!         tls handshake (optional, bounded by read timeout)
//!         serve_connection_with_upgrades(stream, service)
//!         on shutdown: graceful_shutdown() → GOAWAY / close after response
//!     }
//! } until shutdown
//! drain: wait for every connection task (the coordinator bounds this)
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use janus_core::config::ServiceEndpointConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, info, warn};

use crate::error::HostResult;
use crate::shutdown::Shutdown;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// hyper rejects HTTP/1 read buffers smaller than this.
const MIN_HTTP1_BUFFER: usize = 8192;

/// Per-connection transport settings derived from the endpoint config.
#[derive(Debug, Clone)]
pub(crate) struct ServeOptions {
    pub keep_alive: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_header_size: usize,
    pub listen_limit: Option<usize>,
}

impl From<&ServiceEndpointConfig> for ServeOptions {
    fn from(config: &ServiceEndpointConfig) -> Self {
        Self {
            keep_alive: config.keep_alive,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            idle_timeout: config.idle_timeout,
            max_header_size: config.max_header_size,
            listen_limit: config.listen_limit,
        }
    }
}

impl ServeOptions {
    fn keep_alive_interval(&self) -> Option<Duration> {
        (!self.keep_alive.is_zero()).then_some(self.keep_alive)
    }

    fn connection_builder(&self) -> Builder<TokioExecutor> {
        let mut builder = Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .keep_alive(!self.keep_alive.is_zero())
            .header_read_timeout(self.read_timeout)
            .max_buf_size(self.max_header_size.max(MIN_HTTP1_BUFFER));
        builder
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(self.keep_alive_interval())
            .keep_alive_timeout(self.idle_timeout)
            .max_header_list_size(u32::try_from(self.max_header_size).unwrap_or(u32::MAX));
        builder
    }
}

/// Serves `listener` until `shutdown` fires, then waits for open connections.
pub(crate) async fn serve_http<S>(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    service: S,
    options: ServeOptions,
    mut shutdown: Shutdown,
) -> HostResult<()>
where
    S: Service<Request<Incoming>, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let local_addr = listener.local_addr()?;
    let limiter = options
        .listen_limit
        .map(|limit| Arc::new(Semaphore::new(limit)));
    let builder = options.connection_builder();
    let mut connections = JoinSet::new();

    loop {
        let permit = match &limiter {
            Some(limiter) => tokio::select! {
                permit = Arc::clone(limiter).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                _ = shutdown.wait() => break,
            },
            None => None,
        };

        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(%local_addr, error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            _ = shutdown.wait() => break,
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%remote, error = %e, "failed to set TCP_NODELAY");
        }

        // Reap finished connections so the set does not grow unbounded.
        while connections.try_join_next().is_some() {}

        let service = service.clone();
        let builder = builder.clone();
        let tls = tls.clone();
        let shutdown = shutdown.clone();
        let handshake_timeout = options.read_timeout;
        connections.spawn(async move {
            let _permit = permit;
            match tls {
                Some(acceptor) => {
                    match tokio::time::timeout(handshake_timeout, acceptor.accept(stream)).await {
                        Ok(Ok(stream)) => serve_connection(stream, service, builder, shutdown).await,
                        Ok(Err(e)) => debug!(%remote, error = %e, "TLS handshake failed"),
                        Err(_) => debug!(%remote, "TLS handshake timed out"),
                    }
                }
                None => serve_connection(stream, service, builder, shutdown).await,
            }
        });
    }

    drop(listener);
    info!(%local_addr, open = connections.len(), "stopped accepting, draining connections");
    while connections.join_next().await.is_some() {}
    debug!(%local_addr, "all connections closed");
    Ok(())
}

async fn serve_connection<I, S>(io: I, service: S, builder: Builder<TokioExecutor>, mut shutdown: Shutdown)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Service<Request<Incoming>, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(io), TowerToHyperService::new(service));
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    debug!(error = %e, "connection closed with error");
                }
                break;
            }
            _ = shutdown.wait(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}
