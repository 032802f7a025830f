//! Shared helpers for the host suites.
//!
//! `EchoServer` is written out the way tonic-build would generate it, so
//! gRPC can be exercised here without protoc.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use janus_core::context::RequestContext;
use janus_core::validation::{require, FormatRegistry, Validate, ValidationResult};
use janus_core::GRPC_CONTENT_TYPE;
use janus_host::{BoundHost, HostResult, ValidatingCodec};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::body::{empty_body, BoxBody};
use tonic::codec::ProstCodec;
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

pub const ECHO_SERVICE: &str = "janus.test.v1.Echo";
pub const ECHO_PATH: &str = "/janus.test.v1.Echo/Shout";

pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// =============================================================================
// Echo service
// =============================================================================

/// Request and reply of `Echo/Shout`; also accepted as a REST JSON body.
#[derive(Clone, PartialEq, prost::Message, Deserialize)]
pub struct Shout {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(string, tag = "2")]
    #[serde(default)]
    pub ticket: String,
}

impl Shout {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ticket: String::new(),
        }
    }
}

impl Validate for Shout {
    fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
        require("text", &self.text)?;
        if !self.ticket.is_empty() {
            formats.check("ticket", "ticket", &self.ticket)?;
        }
        Ok(())
    }
}

/// Upper-cases the text and answers with the request ID it observed.
#[derive(Debug, Clone, Default)]
pub struct EchoServer;

impl NamedService for EchoServer {
    const NAME: &'static str = ECHO_SERVICE;
}

struct ShoutMethod;

impl UnaryService<Shout> for ShoutMethod {
    type Response = Shout;
    type Future = BoxFuture<'static, Result<Response<Shout>, Status>>;

    fn call(&mut self, request: Request<Shout>) -> Self::Future {
        Box::pin(async move {
            let ctx = RequestContext::from_grpc(&request)?;
            let shout = request.into_inner();
            Ok(Response::new(Shout {
                text: shout.text.to_uppercase(),
                ticket: ctx.request_id().to_string(),
            }))
        })
    }
}

impl tower::Service<http::Request<BoxBody>> for EchoServer {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<BoxBody>) -> Self::Future {
        Box::pin(async move {
            if req.uri().path() != ECHO_PATH {
                let response = http::Response::builder()
                    .header("grpc-status", (tonic::Code::Unimplemented as i32).to_string())
                    .header(http::header::CONTENT_TYPE, GRPC_CONTENT_TYPE)
                    .body(empty_body())
                    .unwrap();
                return Ok(response);
            }
            let mut grpc = Grpc::new(ValidatingCodec::<Shout, Shout>::default());
            Ok(grpc.unary(ShoutMethod, req).await)
        })
    }
}

/// Calls `Echo/Shout` over `channel`.
pub async fn shout(channel: Channel, request: Request<Shout>) -> Result<Response<Shout>, Status> {
    let mut client = tonic::client::Grpc::new(channel);
    client
        .ready()
        .await
        .map_err(|e| Status::unavailable(e.to_string()))?;
    let path = http::uri::PathAndQuery::from_static(ECHO_PATH);
    client
        .unary(request, path, ProstCodec::<Shout, Shout>::default())
        .await
}

pub async fn plaintext_channel(addr: SocketAddr) -> Channel {
    Channel::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap()
}

// =============================================================================
// Running host
// =============================================================================

pub struct Serving {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<HostResult<()>>,
}

impl Serving {
    pub fn spawn(bound: BoundHost) -> Self {
        let (stop, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(bound.serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        Self { stop, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub async fn shutdown(self) -> HostResult<()> {
        let _ = self.stop.send(());
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("host stopped within 10s")
            .expect("serve task did not panic")
    }
}
