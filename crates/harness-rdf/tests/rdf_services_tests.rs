//! Integration tests for the SPARQL and patch log clients.
//!
//! These tests run the real HTTP clients against wiremock stand-ins for
//! the SPARQL endpoint and the RDF Delta server, and drive the relay end
//! to end from a broker message to an appended patch.
//!
//! Covered:
//! 1. SELECT queries in JSON and CSV form, and updates
//! 2. SPARQL endpoint errors surfacing with their status and body
//! 3. Datasource and log metadata over `$/rpc`
//! 4. Patch append, including chaining onto the latest patch id
//! 5. Relay outcomes for `rdf` and non-`rdf` messages

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use harness_broker::{BrokerClient, BrokerMessage, MemoryBroker};
use harness_rdf::{DeltaClient, Patch, PatchRelay, RelayOutcome, SparqlClient};

const TIMEOUT: Duration = Duration::from_secs(5);

fn sparql_client(server: &MockServer) -> SparqlClient {
    SparqlClient::new(
        format!("{}/query", server.uri()),
        format!("{}/update", server.uri()),
        TIMEOUT,
    )
}

async fn mount_describe(server: &MockServer, name: &str, id: &str, latest: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/$/rpc"))
        .and(body_json(json!({
            "opid": "",
            "op": "describe_datasource",
            "arg": {"name": name},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": name,
            "uri": format!("delta:{}", name),
        })))
        .mount(server)
        .await;

    let mut log = json!({
        "id": id,
        "min_version": 1,
        "max_version": 3,
    });
    if let Some(latest) = latest {
        log["latest"] = json!(latest);
    }
    Mock::given(method("POST"))
        .and(path("/$/rpc"))
        .and(body_json(json!({
            "opid": "",
            "op": "describe_log",
            "arg": {"datasource": id},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(log))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_select_parses_json_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("query", "SELECT * WHERE { ?s ?p ?o }"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "head": {"vars": ["s", "p", "o"]},
            "results": {"bindings": [
                {
                    "s": {"type": "uri", "value": "http://example.com/a"},
                    "p": {"type": "uri", "value": "http://example.com/b"},
                    "o": {"type": "literal", "value": "c"}
                }
            ]},
        })))
        .mount(&server)
        .await;

    let results = sparql_client(&server)
        .select("SELECT * WHERE { ?s ?p ?o }")
        .await
        .unwrap();
    assert_eq!(results.head.vars, vec!["s", "p", "o"]);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_select_surfaces_endpoint_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Parse error at line 1"))
        .mount(&server)
        .await;

    let err = sparql_client(&server).select("SELEKT").await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("Parse error"));
}

#[tokio::test]
async fn test_select_csv_posts_the_query_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Content-Type", "application/sparql-query"))
        .and(header("Accept", "text/csv"))
        .and(body_string_contains("SELECT ?s"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("s\nhttp://example.com/a\n"),
        )
        .mount(&server)
        .await;

    let csv = sparql_client(&server)
        .select_csv("SELECT ?s WHERE { ?s ?p ?o }")
        .await
        .unwrap();
    assert!(csv.starts_with("s\n"));
}

#[tokio::test]
async fn test_update_is_form_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .and(body_string_contains("update=INSERT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Update succeeded"))
        .mount(&server)
        .await;

    let body = sparql_client(&server)
        .update("INSERT DATA { <a> <b> <c> }")
        .await
        .unwrap();
    assert_eq!(body, "Update succeeded");
}

#[tokio::test]
async fn test_latest_patch_id_walks_the_metadata() {
    let server = MockServer::start().await;
    mount_describe(&server, "books", "ds-1", Some("patch-uuid-7")).await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    let latest = client.latest_patch_id("books").await.unwrap();
    assert_eq!(latest.as_deref(), Some("patch-uuid-7"));
}

#[tokio::test]
async fn test_latest_patch_id_on_an_empty_log() {
    let server = MockServer::start().await;
    mount_describe(&server, "books", "ds-1", None).await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    assert!(client.latest_patch_id("books").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_log_fetches_a_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("H id <uuid:x> .\nTX .\nA <a> <b> <c> .\nTC .\n"),
        )
        .mount(&server)
        .await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    let body = client.get_log("books", 3).await.unwrap();
    assert!(body.contains("TX ."));
}

#[tokio::test]
async fn test_latest_log_uses_max_version() {
    let server = MockServer::start().await;
    mount_describe(&server, "books", "ds-1", Some("patch-uuid-7")).await;
    Mock::given(method("GET"))
        .and(path("/books/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("patch body"))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    assert_eq!(client.latest_log("books").await.unwrap(), "patch body");
}

#[tokio::test]
async fn test_append_posts_the_rendered_patch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books"))
        .and(header("Content-Type", "application/rdf-patch"))
        .and(body_string_contains("H id <uuid:"))
        .and(body_string_contains("A <a> <b> <c> ."))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    client
        .append("books", &Patch::new("<a> <b> <c> ."))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_append_surfaces_server_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad patch"))
        .mount(&server)
        .await;

    let client = DeltaClient::new(server.uri(), TIMEOUT);
    let err = client
        .append("books", &Patch::new("<a> <b> <c> ."))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PATCH_LOG_ERROR");
}

#[tokio::test]
async fn test_relay_appends_a_chained_patch_for_rdf_messages() {
    let server = MockServer::start().await;
    mount_describe(&server, "books", "ds-1", Some("prev-patch-uuid")).await;
    Mock::given(method("POST"))
        .and(path("/books"))
        .and(body_string_contains("H prev <uuid:prev-patch-uuid> ."))
        .and(body_string_contains("A <a> <b> <c> ."))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let broker = MemoryBroker::new().with_subscription("events", "workers");
    broker
        .send_to_topic(
            "events",
            BrokerMessage::new("<a> <b> <c> .").with_subject("rdf"),
        )
        .await
        .unwrap();
    let received = broker
        .receive_subscription("events", "workers", 1, Duration::ZERO)
        .await
        .unwrap();

    let relay = PatchRelay::new(DeltaClient::new(server.uri(), TIMEOUT), "books");
    let outcome = relay.process(&received[0].message).await.unwrap();

    match outcome {
        RelayOutcome::Applied { sequence, .. } => assert_eq!(sequence, 1),
        other => panic!("expected Applied, got {:?}", other),
    }
    broker
        .complete("events", "workers", received[0].lock_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_relay_passes_over_other_subjects() {
    // No mocks mounted: any request to the server would fail the test.
    let server = MockServer::start().await;
    let relay = PatchRelay::new(DeltaClient::new(server.uri(), TIMEOUT), "books");

    let mut message = BrokerMessage::new("just text").with_subject("note");
    message.sequence_number = 41;
    let outcome = relay.process(&message).await.unwrap();
    assert_eq!(outcome, RelayOutcome::Skipped { sequence: 41 });

    let mut unlabelled = BrokerMessage::new("no subject at all");
    unlabelled.sequence_number = 42;
    let outcome = relay.process(&unlabelled).await.unwrap();
    assert_eq!(outcome, RelayOutcome::Skipped { sequence: 42 });
}
