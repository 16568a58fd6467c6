//! Wire-level tests for the parse transport against a mock HTTP server.

use parserator::{
    ClientConfig, ErrorKind, ParseOptions, ParseRequest, ParseratorClient, RetryConfig,
    ValidationMode,
};
use serde_json::{Map, Value, json};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schema(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn contact_schema() -> Map<String, Value> {
    schema(json!({"name": "string", "email": "email", "phone": "phone"}))
}

async fn client_for(server: &MockServer) -> ParseratorClient {
    ParseratorClient::with_config(
        ClientConfig::new("pk_test_123")
            .with_base_url(server.uri())
            .with_rate_limit(10_000)
            .with_retry(RetryConfig::none()),
    )
    .unwrap()
}

#[tokio::test]
async fn successful_parse_returns_the_extracted_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .and(header("authorization", "Bearer pk_test_123"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req_abc")
                .set_body_json(json!({
                    "success": true,
                    "parsedData": {
                        "name": "John Smith",
                        "email": "john@example.com",
                        "phone": "(555) 123-4567"
                    },
                    "metadata": {"confidence": 0.97, "processingTimeMs": 250}
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ParseRequest::new(
        "John Smith, john@example.com, (555) 123-4567",
        contact_schema(),
    );
    let response = client.parse(&request).await.unwrap();

    assert!(response.success);
    let parsed = response.parsed_data.unwrap();
    assert_eq!(parsed["name"], "John Smith");
    assert_eq!(parsed["email"], "john@example.com");
    assert_eq!(parsed["phone"], "(555) 123-4567");
    assert_eq!(response.metadata.confidence, 0.97);
    assert_eq!(response.metadata.processing_time_ms, 250);
    assert_eq!(response.metadata.request_id.as_deref(), Some("req_abc"));
}

#[tokio::test]
async fn rate_limit_error_carries_the_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(json!({"message": "Rate limit exceeded"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ParseRequest::new("some text", contact_schema());
    let error = client.parse(&request).await.unwrap_err();

    assert_eq!(
        error.kind(),
        &ErrorKind::RateLimited {
            retry_after: Some(2.0)
        }
    );
    assert_eq!(error.retry_after(), Some(2.0));
}

#[tokio::test]
async fn invalid_schema_fails_before_any_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ParseRequest::new("some text", Map::new());
    let error = client.parse(&request).await.unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Validation);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_input_fails_before_any_network_call() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let error = client
        .parse(&ParseRequest::new("   ", contact_schema()))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Validation);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_body_is_data_for_parse_request_and_an_error_for_parse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errorMessage": "schema mismatch"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ParseRequest::new("some text", contact_schema());

    let response = client.parse_request(&request).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error_message.as_deref(), Some("schema mismatch"));

    let error = client.parse(&request).await.unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::ParseFailed);
    assert_eq!(error.message(), "schema mismatch");
}

#[tokio::test]
async fn default_options_merge_under_request_overrides_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let defaults = ParseOptions::new()
        .with_validation(ValidationMode::Lenient)
        .with_locale("en-US");
    let client = ParseratorClient::with_config(
        ClientConfig::new("pk_test_123")
            .with_base_url(server.uri())
            .with_rate_limit(10_000)
            .with_retry(RetryConfig::none())
            .with_default_options(defaults),
    )
    .unwrap();

    let request = ParseRequest::new("some text", contact_schema()).with_options(
        ParseOptions::new()
            .with_validation(ValidationMode::Strict)
            .with_max_retries(1),
    );
    client.parse(&request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["inputData"], "some text");
    assert_eq!(body["outputSchema"]["email"], "email");
    // Override wins for validation; the untouched default locale survives.
    assert_eq!(
        body["options"],
        json!({"validation": "strict", "locale": "en-US", "maxRetries": 1})
    );
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "parsedData": {"name": "Ada"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ParseratorClient::with_config(
        ClientConfig::new("pk_test_123")
            .with_base_url(server.uri())
            .with_rate_limit(10_000)
            .with_retry(RetryConfig {
                max_retries: 3,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
                multiplier: 2.0,
            }),
    )
    .unwrap();

    let request = ParseRequest::new("Ada Lovelace", contact_schema());
    let response = client.parse(&request).await.unwrap();
    assert!(response.success);
}

#[tokio::test]
async fn validation_statuses_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "unprocessable"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ParseratorClient::with_config(
        ClientConfig::new("pk_test_123")
            .with_base_url(server.uri())
            .with_rate_limit(10_000)
            .with_retry(RetryConfig {
                max_retries: 3,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
                multiplier: 2.0,
            }),
    )
    .unwrap();

    let error = client
        .parse(&ParseRequest::new("text", contact_schema()))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Validation);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn authentication_failures_carry_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("x-request-id", "req_auth")
                .set_body_json(json!({"message": "invalid API key"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let error = client
        .parse(&ParseRequest::new("text", contact_schema()))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::Authentication);
    assert_eq!(error.message(), "invalid API key");
    assert_eq!(error.request_id(), Some("req_auth"));
}

#[tokio::test]
async fn malformed_success_body_degrades_to_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ParseRequest::new("text", contact_schema());

    let response = client.parse_request(&request).await.unwrap();
    assert!(!response.success);
    assert_eq!(
        response.error_message.as_deref(),
        Some("Parse operation failed")
    );

    let error = client.parse(&request).await.unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::ParseFailed);
}

#[tokio::test]
async fn malformed_error_body_still_maps_by_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let error = client
        .parse(&ParseRequest::new("text", contact_schema()))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = ParseratorClient::with_config(
        ClientConfig::new("pk_test_123")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(50))
            .with_rate_limit(10_000)
            .with_retry(RetryConfig::none()),
    )
    .unwrap();

    let error = client
        .parse(&ParseRequest::new("text", contact_schema()))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Timeout);
    assert!(error.is_retryable());
}

#[tokio::test]
async fn fallback_usage_summary_is_exposed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/parse"))
        .and(body_partial_json(json!({"inputData": "sample"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req_123")
                .set_body_json(json!({
                    "success": true,
                    "parsedData": {"total": "42"},
                    "metadata": {
                        "confidence": 0.91,
                        "processingTimeMs": 120,
                        "fallback": {
                            "leanLLM": {
                                "totalInvocations": 2,
                                "resolvedFields": 1,
                                "totalTokens": 88,
                                "planConfidenceGate": 0.4,
                                "fields": [
                                    {"field": "total", "action": "invoked", "resolved": true}
                                ]
                            }
                        }
                    }
                })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .parse(&ParseRequest::new(
            "sample",
            schema(json!({"total": "string"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.metadata.request_id.as_deref(), Some("req_123"));
    let usage = response
        .metadata
        .fallback
        .unwrap()
        .lean_llm
        .expect("lean llm usage");
    assert_eq!(usage.total_invocations, 2);
    assert_eq!(usage.total_tokens, 88);
    assert_eq!(usage.plan_confidence_gate, Some(0.4));
    assert_eq!(usage.fields[0].field, "total");
}

#[tokio::test]
async fn health_check_follows_the_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.health_check().await.unwrap());

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let error = client.health_check().await.unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::ServiceUnavailable);
}
