//! # Lifecycle Coordinator
//!
//! Turns a validated [`ServiceEndpointConfig`] into running listeners and
//! owns them until shutdown.
//!
//! ## Startup
//! ```text
//! ServiceHost::builder(config)
//!     .rest(router)              REST surface (axum)
//!     .grpc(routes)              gRPC surface (tonic)
//!     .build()?                  topology resolved, TLS loaded
//!     .bind().await?             sockets bound, ports known
//!     .serve().await             until SIGINT / SIGTERM
//! ```
//!
//! ## Topologies
//! ```text
//! ┌──────────────┬─────────────────────────────────────────────────────────┐
//! │ GrpcOnly     │ tonic Server + interceptor                              │
//! │ RestOnly     │ hyper accept loop + interceptor + axum                  │
//! │ SharedPort   │ hyper accept loop + Multiplexer ─┬─ interceptor + tonic │
//! │              │                                  └─ interceptor + axum  │
//! │ DualPort     │ GrpcOnly and RestOnly side by side, one JoinSet         │
//! └──────────────┴─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown
//! ```text
//! signal ─┐
//!         ├─► ShutdownTrigger ─► every listener stops accepting
//! task  ──┘   (first of)         every connection drains
//! exit                           │
//!                                ▼
//!                      wait ≤ graceful_timeout ─► abort stragglers
//! ```

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use http::StatusCode;
use janus_core::config::ServiceEndpointConfig;
use janus_core::error::ConfigError;
use janus_core::topology::{ListenTopology, Protocol};
use janus_core::validation::FormatRegistry;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tonic::service::Routes;
use tower::Layer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

use crate::error::{HostError, HostResult};
use crate::grpc::{serve_grpc, GrpcRoutes};
use crate::interceptor::InterceptorLayer;
use crate::multiplex::Multiplexer;
use crate::serve::{serve_http, ServeOptions};
use crate::shutdown::{shutdown_signal, ShutdownTrigger};
use crate::tls::TlsMaterial;

// =============================================================================
// Registration
// =============================================================================

/// Something that can produce the REST surface of a service.
pub trait RestApi: Send + Sync + 'static {
    fn router(&self) -> Router;
}

impl RestApi for Router {
    fn router(&self) -> Router {
        self.clone()
    }
}

/// Collects the handlers before the host is built.
#[derive(Debug)]
pub struct ServiceHostBuilder {
    config: ServiceEndpointConfig,
    rest: Option<Router>,
    grpc: Option<Routes>,
    formats: Option<FormatRegistry>,
}

impl ServiceHostBuilder {
    /// Registers the REST surface. Ignored when REST is not served.
    pub fn rest(mut self, api: impl RestApi) -> Self {
        self.rest = Some(api.router());
        self
    }

    /// Registers the gRPC services. Ignored when gRPC is not served.
    pub fn grpc(mut self, routes: Routes) -> Self {
        self.grpc = Some(routes);
        self
    }

    /// Formats to validate payloads with, in place of the standard set.
    ///
    /// Installed process-wide by [`build`](Self::build).
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Some(formats);
        self
    }

    /// Resolves the topology, loads TLS material and installs the formats.
    ///
    /// ## Errors
    /// - [`HostError::Config`] when no protocol has a usable port, TLS is
    ///   half configured, or a format registry is already in use
    /// - [`HostError::Tls`] when certificate files cannot be read or parsed
    pub fn build(self) -> HostResult<ServiceHost> {
        let topology = self.config.validate()?;
        let tls = TlsMaterial::from_config(&self.config)?;
        if let Some(formats) = self.formats {
            formats
                .install()
                .map_err(|_| ConfigError::FormatsAlreadyInstalled)?;
        }

        if topology.serves(Protocol::Rest) && self.rest.is_none() {
            warn!("REST is enabled but no router was registered, serving an empty router");
        }
        if topology.serves(Protocol::Grpc) && self.grpc.is_none() {
            warn!("gRPC is enabled but no service was registered, serving no methods");
        }

        Ok(ServiceHost {
            config: self.config,
            topology,
            tls,
            rest: self.rest.unwrap_or_default(),
            grpc: self.grpc.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Host
// =============================================================================

/// A configured host that has not bound any socket yet.
#[derive(Debug)]
pub struct ServiceHost {
    config: ServiceEndpointConfig,
    topology: ListenTopology,
    tls: Option<TlsMaterial>,
    rest: Router,
    grpc: Routes,
}

impl ServiceHost {
    pub fn builder(config: ServiceEndpointConfig) -> ServiceHostBuilder {
        ServiceHostBuilder {
            config,
            rest: None,
            grpc: None,
            formats: None,
        }
    }

    pub fn topology(&self) -> ListenTopology {
        self.topology
    }

    pub fn config(&self) -> &ServiceEndpointConfig {
        &self.config
    }

    /// Binds every listener the topology needs.
    pub async fn bind(self) -> HostResult<BoundHost> {
        let listeners = match self.topology {
            ListenTopology::GrpcOnly { port } => Listeners::Grpc(bind(&self.config, port).await?),
            ListenTopology::RestOnly { port } => Listeners::Rest(bind(&self.config, port).await?),
            ListenTopology::SharedPort { port } => Listeners::Shared(bind(&self.config, port).await?),
            ListenTopology::DualPort { grpc_port, rest_port } => Listeners::Dual {
                grpc: bind(&self.config, grpc_port).await?,
                rest: bind(&self.config, rest_port).await?,
            },
        };
        Ok(BoundHost { host: self, listeners })
    }

    /// Binds and serves until SIGINT or SIGTERM.
    pub async fn serve(self) -> HostResult<()> {
        self.bind().await?.serve().await
    }

    /// Binds and serves until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> HostResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.bind().await?.serve_with_shutdown(signal).await
    }
}

async fn bind(config: &ServiceEndpointConfig, port: u16) -> HostResult<TcpListener> {
    let address = config.bind_address(port);
    TcpListener::bind(&address)
        .await
        .map_err(|source| HostError::Bind { address, source })
}

#[derive(Debug)]
enum Listeners {
    Grpc(TcpListener),
    Rest(TcpListener),
    Shared(TcpListener),
    Dual { grpc: TcpListener, rest: TcpListener },
}

/// A host whose sockets are bound; nothing is accepted until it serves.
#[derive(Debug)]
pub struct BoundHost {
    host: ServiceHost,
    listeners: Listeners,
}

impl BoundHost {
    pub fn topology(&self) -> ListenTopology {
        self.host.topology
    }

    /// Address the given protocol is reachable on, if it is served.
    pub fn local_addr(&self, protocol: Protocol) -> Option<SocketAddr> {
        let listener = match (&self.listeners, protocol) {
            (Listeners::Grpc(l), Protocol::Grpc) => l,
            (Listeners::Rest(l), Protocol::Rest) => l,
            (Listeners::Shared(l), _) => l,
            (Listeners::Dual { grpc, .. }, Protocol::Grpc) => grpc,
            (Listeners::Dual { rest, .. }, Protocol::Rest) => rest,
            _ => return None,
        };
        listener.local_addr().ok()
    }

    /// Serves until SIGINT or SIGTERM.
    pub async fn serve(self) -> HostResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves or a listener fails, then drains.
    ///
    /// Returns `Ok(())` after a clean, signal-driven shutdown (even when
    /// the grace period expired and stragglers were aborted) and the first
    /// listener error otherwise.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> HostResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let BoundHost { host, listeners } = self;
        let options = ServeOptions::from(&host.config);
        let grace = host.config.graceful_timeout;
        let (acceptor, grpc_tls) = match &host.tls {
            Some(material) => (Some(material.acceptor()?), Some(material.grpc_config())),
            None => (None, None),
        };

        let mut router = host.rest;
        if !options.write_timeout.is_zero() {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                options.write_timeout,
            ));
        }
        let interceptor = InterceptorLayer::new();
        let trigger = ShutdownTrigger::new();
        let mut tasks: JoinSet<HostResult<()>> = JoinSet::new();

        info!(
            topology = %host.topology,
            tls = host.tls.is_some(),
            mutual_tls = host.tls.as_ref().map(TlsMaterial::requires_client_auth).unwrap_or(false),
            "starting listeners"
        );
        match listeners {
            Listeners::Grpc(listener) => {
                tasks.spawn(serve_grpc(listener, host.grpc, grpc_tls, options, trigger.subscribe()));
            }
            Listeners::Rest(listener) => {
                tasks.spawn(serve_http(
                    listener,
                    acceptor,
                    interceptor.layer(router),
                    options,
                    trigger.subscribe(),
                ));
            }
            Listeners::Shared(listener) => {
                let service = Multiplexer::new(
                    interceptor.layer(router),
                    interceptor.layer(GrpcRoutes::new(host.grpc)),
                );
                tasks.spawn(serve_http(listener, acceptor, service, options, trigger.subscribe()));
            }
            Listeners::Dual { grpc, rest } => {
                tasks.spawn(serve_grpc(
                    grpc,
                    host.grpc,
                    grpc_tls,
                    options.clone(),
                    trigger.subscribe(),
                ));
                tasks.spawn(serve_http(
                    rest,
                    acceptor,
                    interceptor.layer(router),
                    options,
                    trigger.subscribe(),
                ));
            }
        }

        let mut first_error = None;
        tokio::select! {
            _ = signal => info!("shutdown requested"),
            Some(joined) = tasks.join_next() => match flatten(joined) {
                Ok(()) => warn!("listener exited before shutdown was requested"),
                Err(e) => {
                    error!(error = %e, "listener failed, shutting down");
                    first_error = Some(e);
                }
            },
        }

        trigger.trigger();
        info!(grace = ?grace, remaining = tasks.len(), "draining in-flight requests");
        if tokio::time::timeout(grace, drain(&mut tasks, &mut first_error))
            .await
            .is_err()
        {
            warn!(
                grace = ?grace,
                remaining = tasks.len(),
                "grace period expired, aborting remaining connections"
            );
            tasks.shutdown().await;
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("shutdown complete");
                Ok(())
            }
        }
    }
}

async fn drain(tasks: &mut JoinSet<HostResult<()>>, first_error: &mut Option<HostError>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = flatten(joined) {
            error!(error = %e, "listener failed during shutdown");
            first_error.get_or_insert(e);
        }
    }
}

fn flatten(joined: Result<HostResult<()>, JoinError>) -> HostResult<()> {
    joined.map_err(|e| HostError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_no_ports() {
        let config = ServiceEndpointConfig::new("127.0.0.1")
            .with_shared_port(8080)
            .disable_grpc()
            .disable_rest();
        let err = ServiceHost::builder(config).build().unwrap_err();
        assert!(matches!(err, HostError::Config(ConfigError::NoPortsEnabled)));
    }

    #[test]
    fn test_build_rejects_half_tls() {
        let mut config = ServiceEndpointConfig::new("127.0.0.1").with_shared_port(8080);
        config.tls_cert_path = Some("/tmp/cert.pem".into());
        let err = ServiceHost::builder(config).build().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_build_without_handlers_still_builds() {
        let config = ServiceEndpointConfig::new("127.0.0.1").with_ports(9000, 8080);
        let host = ServiceHost::builder(config).build().unwrap();
        assert_eq!(
            host.topology(),
            ListenTopology::DualPort {
                grpc_port: 9000,
                rest_port: 8080
            }
        );
    }

    #[tokio::test]
    async fn test_local_addr_per_protocol() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = ServiceEndpointConfig::new("127.0.0.1").with_ports(0, port);

        let bound = ServiceHost::builder(config)
            .rest(Router::new())
            .build()
            .unwrap()
            .bind()
            .await
            .unwrap();
        assert_eq!(bound.topology(), ListenTopology::RestOnly { port });
        assert_eq!(bound.local_addr(Protocol::Rest).unwrap().port(), port);
        assert!(bound.local_addr(Protocol::Grpc).is_none());
    }

    #[tokio::test]
    async fn test_occupied_port_is_bind_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let config = ServiceEndpointConfig::new("127.0.0.1").with_shared_port(port);
        let err = ServiceHost::builder(config)
            .build()
            .unwrap()
            .bind()
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Bind { .. }));
    }
}
