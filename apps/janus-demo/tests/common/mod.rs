//! Shared helpers for the end-to-end suites.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use janus_core::config::ServiceEndpointConfig;
use janus_core::topology::Protocol;
use janus_demo::notes::NoteStore;
use janus_demo::proto::note_service_client::NoteServiceClient;
use janus_demo::proto::CreateNoteRequest;
use janus_demo::{build_host, build_invoker};
use janus_host::{HostResult, ServiceHost};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn create_request(title: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        title: title.to_string(),
        body: "body".to_string(),
        author_email: "ada@example.com".to_string(),
    }
}

pub struct TestServer {
    pub grpc: Option<SocketAddr>,
    pub rest: Option<SocketAddr>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<HostResult<()>>,
}

impl TestServer {
    /// Notes service with a fresh store on `endpoint`.
    pub async fn start(endpoint: ServiceEndpointConfig) -> Self {
        let invoker = build_invoker(Arc::new(NoteStore::new()), Duration::from_secs(5)).unwrap();
        Self::start_host(build_host(endpoint, invoker).unwrap()).await
    }

    pub async fn start_host(host: ServiceHost) -> Self {
        let bound = host.bind().await.unwrap();
        let grpc = bound.local_addr(Protocol::Grpc);
        let rest = bound.local_addr(Protocol::Rest);
        let (stop, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(bound.serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        Self {
            grpc,
            rest,
            stop,
            handle,
        }
    }

    pub async fn grpc_client(&self) -> NoteServiceClient<Channel> {
        let addr = self.grpc.expect("gRPC is served");
        NoteServiceClient::connect(format!("http://{addr}")).await.unwrap()
    }

    pub fn rest_url(&self, path: &str) -> String {
        let addr = self.rest.expect("REST is served");
        format!("http://{addr}{path}")
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Triggers shutdown and waits for `serve` to return.
    pub async fn shutdown(self) -> HostResult<()> {
        let _ = self.stop.send(());
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("host stopped within 10s")
            .expect("serve task did not panic")
    }
}
