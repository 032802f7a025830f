//! A panicking handler answers Internal / 500 and the host keeps serving.

mod common;

use axum::routing::get;
use axum::Router;
use janus_core::config::ServiceEndpointConfig;
use janus_core::context::REQUEST_ID_HEADER;
use janus_demo::proto::note_service_server::{NoteService, NoteServiceServer};
use janus_demo::proto::{CreateNoteRequest, GetNoteRequest, ImportNotesResponse, Note};
use janus_host::ServiceHost;
use tonic::service::Routes;
use tonic::{Code, Request, Response, Status, Streaming};

use common::{create_request, free_port, TestServer};

struct PanickingNotes;

#[tonic::async_trait]
impl NoteService for PanickingNotes {
    async fn create_note(&self, _request: Request<CreateNoteRequest>) -> Result<Response<Note>, Status> {
        panic!("create exploded");
    }

    async fn get_note(&self, _request: Request<GetNoteRequest>) -> Result<Response<Note>, Status> {
        panic!("get exploded");
    }

    async fn import_notes(
        &self,
        _request: Request<Streaming<CreateNoteRequest>>,
    ) -> Result<Response<ImportNotesResponse>, Status> {
        panic!("import exploded");
    }
}

async fn boom() -> &'static str {
    panic!("rest exploded")
}

fn rest() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/boom", get(boom))
}

async fn start(config: ServiceEndpointConfig) -> TestServer {
    let host = ServiceHost::builder(config)
        .rest(rest())
        .grpc(Routes::new(NoteServiceServer::new(PanickingNotes)))
        .build()
        .unwrap();
    TestServer::start_host(host).await
}

#[tokio::test]
async fn test_grpc_panic_is_internal_and_host_survives() {
    let port = free_port().await;
    let server = start(ServiceEndpointConfig::new("127.0.0.1").with_shared_port(port)).await;
    let mut client = server.grpc_client().await;

    for _ in 0..2 {
        let status = client.create_note(create_request("x")).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "Internal server error");
    }

    let response = reqwest::get(server.rest_url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(server.is_running());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panic_on_dedicated_grpc_listener() {
    let grpc_port = free_port().await;
    let rest_port = free_port().await;
    let server = start(ServiceEndpointConfig::new("127.0.0.1").with_ports(grpc_port, rest_port)).await;
    let mut client = server.grpc_client().await;

    let status = client
        .get_note(GetNoteRequest {
            id: uuid::Uuid::new_v4().to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(server.is_running());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rest_panic_is_500_and_host_survives() {
    let port = free_port().await;
    let server = start(ServiceEndpointConfig::new("127.0.0.1").with_shared_port(port)).await;

    let response = reqwest::get(server.rest_url("/boom")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Internal server error");

    let response = reqwest::get(server.rest_url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    server.shutdown().await.unwrap();
}
