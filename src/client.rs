//! HTTP transport for the Parserator API.
//!
//! The client validates locally, merges options, paces itself through the
//! request gate, and sends exactly one logical POST per call with the retry
//! wrapper around it. HTTP statuses and response bodies are normalized into
//! the error taxonomy or a structured [`ParseResponse`].

use crate::batch::{self, BatchOptions, BatchParseResponse};
use crate::config::ClientConfig;
use crate::error::{ParseratorError, Result};
use crate::limiter::RequestGate;
use crate::options::ParseOptions;
use crate::request::ParseRequest;
use crate::response::{DEFAULT_FAILURE_MESSAGE, ParseResponse};
use crate::retry::with_retry;
use crate::validate;
use reqwest::{Client, StatusCode, header};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// User agent reported to the API.
const USER_AGENT: &str = concat!("parserator-rust/", env!("CARGO_PKG_VERSION"));

/// Response header carrying the request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

const PARSE_PATH: &str = "/v1/parse";
const HEALTH_PATH: &str = "/health";

/// Client for the Parserator API.
#[derive(Debug, Clone)]
pub struct ParseratorClient {
    http: Client,
    config: Arc<ClientConfig>,
    gate: Arc<RequestGate>,
}

impl ParseratorClient {
    /// Client with default configuration for the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key))
    }

    /// Client configured from [`crate::config::DEFAULT_ENV_VAR`].
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Client with the API key read from a named environment variable.
    pub fn from_env_var(name: &str) -> Result<Self> {
        Self::with_config(ClientConfig::from_env_var(name)?)
    }

    /// Client with explicit configuration.
    pub fn with_config(mut config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ParseratorError::validation("API key contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ParseratorError::network(format!("failed to build HTTP client: {e}")))?;

        let gate = Arc::new(RequestGate::new(config.rate_limit_nonzero()));

        Ok(Self {
            http,
            config: Arc::new(config),
            gate,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Parse unstructured text, raising on a failed parse.
    ///
    /// A response whose body reports `success: false` becomes a parse-failed
    /// error carrying the body's message and the request correlation id.
    pub async fn parse(&self, request: &ParseRequest) -> Result<ParseResponse> {
        let response = self.parse_request(request).await?;
        if response.success {
            return Ok(response);
        }

        let message = response
            .error
            .as_ref()
            .map(|error| error.message.clone())
            .or_else(|| response.error_message.clone())
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
        let mut error = ParseratorError::parse_failed(message)
            .with_request_id(response.metadata.request_id.clone());
        if let Some(wire) = &response.error {
            if !wire.details.is_empty() {
                error = error.with_details(Value::Object(wire.details.clone()));
            }
        }
        Err(error)
    }

    /// Parse unstructured text, returning the normalized response even when
    /// the service reports a failed parse.
    ///
    /// Input is validated before any network activity; invalid text or an
    /// invalid schema fails fast without a request being issued.
    pub async fn parse_request(&self, request: &ParseRequest) -> Result<ParseResponse> {
        validate::validate_input_data(request.input_data())?;
        validate::ensure_valid_schema(request.output_schema())?;

        let effective =
            ParseOptions::merge(self.config.default_options.as_ref(), request.options());
        let payload = request.to_payload(&effective);

        self.gate.acquire().await;

        let response = with_retry(
            || self.send_once(&payload),
            &self.config.retry,
            |error, _attempt| error.is_retryable(),
        )
        .await?;

        debug!(
            success = response.success,
            confidence = response.metadata.confidence,
            request_id = response.metadata.request_id.as_deref().unwrap_or(""),
            "parse request completed"
        );
        Ok(response)
    }

    /// Fan a sequence of requests out to the batch scheduler.
    ///
    /// Per-item failures are returned as data; only a halt-on-error batch
    /// raises, and only with the batch-halted error.
    pub async fn batch_parse(
        &self,
        requests: Vec<ParseRequest>,
        options: &BatchOptions,
    ) -> Result<BatchParseResponse> {
        batch::execute(requests, options, |request| async move {
            self.parse(&request).await
        })
        .await
    }

    /// Whether the service reports itself healthy.
    pub async fn health_check(&self) -> Result<bool> {
        let url = self.url(HEALTH_PATH);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }

        let request_id = extract_request_id(response.headers());
        let retry_after = extract_retry_after(response.headers());
        let body = lenient_body(response.text().await.unwrap_or_default());
        Err(map_status_error(status, &body, request_id, retry_after))
    }

    /// Send a single request without retries.
    async fn send_once(&self, payload: &Value) -> Result<ParseResponse> {
        let url = self.url(PARSE_PATH);
        trace!(%url, "sending parse request");

        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let request_id = extract_request_id(response.headers());
        let retry_after = extract_retry_after(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = lenient_body(text);

        if !status.is_success() {
            return Err(map_status_error(status, &body, request_id, retry_after));
        }

        Ok(ParseResponse::from_body(body, request_id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, error: reqwest::Error) -> ParseratorError {
        if error.is_timeout() {
            ParseratorError::timeout(self.config.timeout.as_millis() as u64)
        } else {
            ParseratorError::network(format!("request failed: {error}"))
        }
    }
}

/// Decode a body, degrading malformed or non-JSON text to an empty mapping.
fn lenient_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn extract_request_id(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn extract_retry_after(headers: &header::HeaderMap) -> Option<f64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
}

/// Map a non-success HTTP status and body to the error taxonomy.
fn map_status_error(
    status: StatusCode,
    body: &Value,
    request_id: Option<String>,
    retry_after: Option<f64>,
) -> ParseratorError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("errorMessage").and_then(Value::as_str));

    let error = match status.as_u16() {
        400 | 409 | 422 => ParseratorError::validation(message.unwrap_or("Invalid request")),
        401 | 403 => ParseratorError::authentication(message.unwrap_or("Authentication failed")),
        402 => ParseratorError::quota_exceeded(message.unwrap_or("Quota exceeded")),
        429 => {
            ParseratorError::rate_limited(message.unwrap_or("Rate limit exceeded"), retry_after)
        }
        500 | 502 | 503 | 504 => ParseratorError::service_unavailable(
            message.unwrap_or("Service temporarily unavailable"),
        ),
        _ => ParseratorError::parse_failed(message.unwrap_or("An unexpected error occurred")),
    };

    error
        .with_details(serde_json::json!({
            "status": status.as_u16(),
            "response": body,
        }))
        .with_request_id(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn client_rejects_blank_api_key() {
        assert!(ParseratorClient::new("   ").is_err());
    }

    #[test]
    fn client_builds_with_defaults() {
        let client = ParseratorClient::new("pk_test_1").unwrap();
        assert_eq!(client.config().rate_limit, 10);
    }

    #[test]
    fn status_table_maps_to_taxonomy() {
        let body = json!({"message": "nope"});
        for status in [400u16, 409, 422] {
            let error =
                map_status_error(StatusCode::from_u16(status).unwrap(), &body, None, None);
            assert_eq!(error.kind(), &ErrorKind::Validation, "status {status}");
        }
        for status in [401u16, 403] {
            let error =
                map_status_error(StatusCode::from_u16(status).unwrap(), &body, None, None);
            assert_eq!(error.kind(), &ErrorKind::Authentication, "status {status}");
        }
        let error = map_status_error(StatusCode::PAYMENT_REQUIRED, &body, None, None);
        assert_eq!(error.kind(), &ErrorKind::QuotaExceeded);

        let error = map_status_error(StatusCode::TOO_MANY_REQUESTS, &body, None, Some(2.0));
        assert_eq!(error.retry_after(), Some(2.0));

        for status in [500u16, 502, 503, 504] {
            let error =
                map_status_error(StatusCode::from_u16(status).unwrap(), &body, None, None);
            assert_eq!(
                error.kind(),
                &ErrorKind::ServiceUnavailable,
                "status {status}"
            );
        }

        let error = map_status_error(StatusCode::NOT_FOUND, &body, None, None);
        assert_eq!(error.kind(), &ErrorKind::ParseFailed);
        assert_eq!(error.details().unwrap()["status"], 404);
    }

    #[test]
    fn status_error_carries_body_message_and_request_id() {
        let body = json!({"message": "key revoked"});
        let error = map_status_error(
            StatusCode::UNAUTHORIZED,
            &body,
            Some("req_7".to_string()),
            None,
        );
        assert_eq!(error.message(), "key revoked");
        assert_eq!(error.request_id(), Some("req_7"));
    }

    #[test]
    fn lenient_body_degrades_to_empty_object() {
        assert_eq!(lenient_body("<html>".to_string()), json!({}));
        assert_eq!(lenient_body(String::new()), json!({}));
        assert_eq!(lenient_body(r#"{"a": 1}"#.to_string()), json!({"a": 1}));
    }
}
