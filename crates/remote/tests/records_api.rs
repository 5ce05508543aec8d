//! HTTP-level tests for the records API client against a mock server.

use std::time::Duration;

use assert_matches::assert_matches;
use bibflow_core::RecordKind;
use bibflow_remote::{RecordsApi, RecordsApiConfig, RemoteError};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer, token: Option<&str>) -> RecordsApi {
    RecordsApi::new(&RecordsApiConfig {
        base_url: format!("{}/api/", server.uri()),
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn create_posts_payload_and_returns_identity() {
    let server = MockServer::start().await;
    let uuid = Uuid::new_v4();
    let payload = json!({"titles": [{"title": "Gravitational waves"}]});

    Mock::given(method("POST"))
        .and(path("/api/lit"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("ETag", "\"0\"")
                .set_body_json(json!({
                    "uuid": uuid,
                    "metadata": {"control_number": 1234}
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = api(&server, Some("s3cret"))
        .create(RecordKind::Literature, &payload)
        .await
        .unwrap();

    assert_eq!(created.control_number, 1234);
    assert_eq!(created.uuid, uuid);
    assert_eq!(created.version, Some(1));
}

#[tokio::test]
async fn authors_use_aut_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/aut"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "uuid": Uuid::new_v4(),
            "metadata": {"control_number": 99}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = api(&server, None)
        .create(RecordKind::Authors, &json!({"name": {"value": "Doe, J."}}))
        .await
        .unwrap();
    assert_eq!(created.control_number, 99);
    assert_eq!(created.version, None);
}

#[tokio::test]
async fn replace_sends_if_match_precondition() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/lit/1234"))
        .and(header("if-match", "\"2\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"3\"")
                .set_body_json(json!({"metadata": {"control_number": 1234}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let replaced = api(&server, None)
        .replace(RecordKind::Literature, 1234, &json!({"control_number": 1234}), Some(3))
        .await
        .unwrap();
    assert_eq!(replaced.control_number, 1234);
    assert_eq!(replaced.version, Some(4));
}

#[tokio::test]
async fn replace_without_version_is_unconditional() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/lit/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"control_number": 7}})))
        .expect(1)
        .mount(&server)
        .await;

    api(&server, None)
        .replace(RecordKind::Literature, 7, &json!({}), None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("if-match").is_none());
}

#[tokio::test]
async fn precondition_failed_is_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({"message": "Precondition failed"})))
        .mount(&server)
        .await;

    let err = api(&server, None)
        .replace(RecordKind::Literature, 1, &json!({}), Some(2))
        .await
        .unwrap_err();
    assert_matches!(err, RemoteError::Conflict { status: 412, .. });
}

#[tokio::test]
async fn bad_gateway_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = api(&server, None)
        .create(RecordKind::Literature, &json!({}))
        .await
        .unwrap_err();
    assert_matches!(err, RemoteError::BadGateway);
    assert!(err.is_transient());
}

#[tokio::test]
async fn other_errors_carry_status_and_text_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = api(&server, None)
        .create(RecordKind::Literature, &json!({}))
        .await
        .unwrap_err();
    assert_matches!(err, RemoteError::Api { status: 500, ref body } if body == &json!("boom"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn get_reads_metadata() {
    let server = MockServer::start().await;
    let uuid = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/lit/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "W/\"5\"")
                .set_body_json(json!({
                    "id": 42,
                    "uuid": uuid,
                    "metadata": {"control_number": 42, "titles": [{"title": "T"}]}
                })),
        )
        .mount(&server)
        .await;

    let record = api(&server, None).get(RecordKind::Literature, 42).await.unwrap();
    assert_eq!(record.control_number, 42);
    assert_eq!(record.uuid, Some(uuid));
    assert_eq!(record.version, Some(6));
    assert_eq!(record.metadata["titles"][0]["title"], json!("T"));
}

#[tokio::test]
async fn missing_control_number_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "uuid": Uuid::new_v4(),
            "metadata": {}
        })))
        .mount(&server)
        .await;

    let err = api(&server, None)
        .create(RecordKind::Literature, &json!({}))
        .await
        .unwrap_err();
    assert_matches!(err, RemoteError::MalformedResponse(_));
}
