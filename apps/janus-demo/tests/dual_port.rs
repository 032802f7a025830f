//! gRPC and REST on separate listeners, plus shutdown behaviour.

mod common;

use std::time::Duration;

use janus_core::config::ServiceEndpointConfig;
use janus_core::topology::ListenTopology;
use janus_demo::proto::GetNoteRequest;
use serde_json::{json, Value};

use common::{create_request, free_port, TestServer};

async fn dual() -> (TestServer, u16, u16) {
    let grpc_port = free_port().await;
    let rest_port = free_port().await;
    let config = ServiceEndpointConfig::new("127.0.0.1").with_ports(grpc_port, rest_port);
    assert_eq!(
        config.validate().unwrap(),
        ListenTopology::DualPort {
            grpc_port,
            rest_port
        }
    );
    (TestServer::start(config).await, grpc_port, rest_port)
}

#[tokio::test]
async fn test_each_protocol_on_its_own_port() {
    let (server, grpc_port, rest_port) = dual().await;
    assert_eq!(server.grpc.unwrap().port(), grpc_port);
    assert_eq!(server.rest.unwrap().port(), rest_port);

    let mut client = server.grpc_client().await;
    let created = client
        .create_note(create_request("dual"))
        .await
        .unwrap()
        .into_inner();

    let response = reqwest::get(server.rest_url(&format!("/v1/notes/{}", created.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "dual");

    let response = reqwest::Client::new()
        .post(server.rest_url("/v1/notes"))
        .json(&json!({"title": "over rest", "authorEmail": "grace@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_returns_ok_and_closes_both_ports() {
    let (server, _, _) = dual().await;
    let grpc = server.grpc.unwrap();
    let rest = server.rest.unwrap();

    server.shutdown().await.unwrap();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    assert!(client.get(format!("http://{rest}/v1/notes/x")).send().await.is_err());
    assert!(
        janus_demo::proto::note_service_client::NoteServiceClient::connect(format!("http://{grpc}"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_grpc_only_topology() {
    let port = free_port().await;
    let config = ServiceEndpointConfig::new("127.0.0.1")
        .with_ports(port, port)
        .disable_rest();
    let server = TestServer::start(config).await;
    assert!(server.rest.is_none());

    let mut client = server.grpc_client().await;
    let note = client
        .create_note(create_request("grpc only"))
        .await
        .unwrap()
        .into_inner();
    let fetched = client
        .get_note(GetNoteRequest { id: note.id.clone() })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(fetched, note);

    server.shutdown().await.unwrap();
}
