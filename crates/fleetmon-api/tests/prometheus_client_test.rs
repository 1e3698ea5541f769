#![allow(clippy::unwrap_used)]
// Integration tests for `PrometheusClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fleetmon_api::{Error, PrometheusClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PrometheusClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PrometheusClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn vector(result: serde_json::Value) -> serde_json::Value {
    json!({
        "status": "success",
        "data": { "resultType": "vector", "result": result }
    })
}

// ── Instant queries ─────────────────────────────────────────────────

#[tokio::test]
async fn test_query_instant_vector() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", "camera_value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(json!([
            {
                "metric": { "__name__": "camera_value", "instance": "10.0.0.5:5000" },
                "value": [1_700_000_000.0, "2"]
            },
            {
                "metric": { "__name__": "camera_value", "instance": "10.0.0.6:5000" },
                "value": [1_700_000_000.0, "0"]
            }
        ]))))
        .mount(&server)
        .await;

    let samples = client.query_instant("camera_value").await.unwrap();

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].instance(), Some("10.0.0.5:5000"));
    assert_eq!(samples[0].raw_value(), Some("2"));
    assert_eq!(samples[1].raw_value(), Some("0"));
}

#[tokio::test]
async fn test_query_with_label_filter_is_url_encoded() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", r#"up{job="devices"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(json!([]))))
        .mount(&server)
        .await;

    let samples = client.query_instant(r#"up{job="devices"}"#).await.unwrap();
    assert!(samples.is_empty());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let client = PrometheusClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    )
    .with_bearer_token("tok-123".to_string().into());

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(json!([]))))
        .mount(&server)
        .await;

    client.query_instant("up").await.unwrap();
}

// ── Failure modes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_error_envelope_maps_to_query_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "1:7: parse error: unexpected end of input"
        })))
        .mount(&server)
        .await;

    let result = client.query_instant("up{job=").await;

    match result {
        Err(Error::Query {
            error_type,
            message,
        }) => {
            assert_eq!(error_type, "bad_data");
            assert!(message.contains("parse error"));
        }
        other => panic!("expected Query error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_envelope_is_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client.query_instant("up").await.unwrap_err();

    assert!(
        matches!(err, Error::Http { status: 503, .. }),
        "expected Http 503, got: {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.query_instant("up").await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_scalar_result_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "resultType": "scalar", "result": [1_700_000_000.0, "1"] }
        })))
        .mount(&server)
        .await;

    let result = client.query_instant("1").await;
    assert!(
        matches!(result, Err(Error::UnexpectedResultType { ref result_type }) if result_type == "scalar"),
        "expected UnexpectedResultType, got: {result:?}"
    );
}

#[tokio::test]
async fn test_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not prometheus</html>"))
        .mount(&server)
        .await;

    let result = client.query_instant("up").await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(200));
    let client = PrometheusClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vector(json!([])))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.query_instant("up").await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 9 (discard) on localhost is almost never listening.
    let client = PrometheusClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
    );

    let err = client.query_instant("up").await.unwrap_err();
    assert!(
        matches!(err, Error::Transport(_)),
        "expected Transport error, got: {err:?}"
    );
}
