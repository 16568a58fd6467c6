//! Error taxonomy for the Parserator client.
//!
//! Every failure surfaced by this crate is a [`ParseratorError`]: an error
//! kind, a human-readable message, an optional request correlation id, and
//! optional JSON details. Retry eligibility and HTTP status mapping dispatch
//! on the kind, never on downcasting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stable machine-readable codes carried on the wire and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad local input or a 4xx validation status.
    ValidationError,
    /// The API rejected the credentials (401/403).
    AuthenticationError,
    /// The API rate limit was exceeded (429).
    RateLimitExceeded,
    /// The organization has exhausted its usage allowance (402).
    QuotaExceeded,
    /// A connection-level failure prevented the request from completing.
    NetworkError,
    /// The request exceeded the configured deadline.
    Timeout,
    /// The service ran but could not satisfy the requested schema.
    ParseFailed,
    /// The service is temporarily unavailable (5xx).
    ServiceUnavailable,
    /// A halt-on-error batch stopped after its first failure.
    BatchHalted,
    /// Catch-all for codes this client does not recognize.
    #[serde(other)]
    InternalError,
}

impl ErrorCode {
    /// The wire representation of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ParseFailed => "PARSE_FAILED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BatchHalted => "BATCH_HALTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// The failure classes the client distinguishes.
///
/// [`RateLimited`](ErrorKind::RateLimited) carries the server-supplied
/// retry-after value in seconds when one was present on the response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Bad local input or a 4xx validation status.
    Validation,
    /// Authentication with the API failed.
    Authentication,
    /// The API rate limit was exceeded.
    RateLimited {
        /// Seconds the server asked the caller to wait, when supplied.
        retry_after: Option<f64>,
    },
    /// The organization's usage allowance is exhausted.
    QuotaExceeded,
    /// A transport-level connection failure.
    Network,
    /// The configured deadline was exceeded.
    Timeout,
    /// The service ran but could not satisfy the schema.
    ParseFailed,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
    /// A halt-on-error batch stopped after its first failure.
    BatchHalted,
}

impl ErrorKind {
    /// The stable code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation => ErrorCode::ValidationError,
            Self::Authentication => ErrorCode::AuthenticationError,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::QuotaExceeded => ErrorCode::QuotaExceeded,
            Self::Network => ErrorCode::NetworkError,
            Self::Timeout => ErrorCode::Timeout,
            Self::ParseFailed => ErrorCode::ParseFailed,
            Self::ServiceUnavailable => ErrorCode::ServiceUnavailable,
            Self::BatchHalted => ErrorCode::BatchHalted,
        }
    }
}

/// Structured error payload as it appears inside response bodies and batch
/// failure lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Additional context supplied by the service.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

/// Error type for all client operations.
///
/// Constructed at the transport boundary (or when a batch halts) and never
/// mutated afterwards.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ParseratorError {
    kind: ErrorKind,
    message: String,
    request_id: Option<String>,
    details: Option<Value>,
}

impl ParseratorError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: None,
            details: None,
        }
    }

    /// A local or server-side validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Authentication with the API failed.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// The API rate limit was exceeded.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<f64>) -> Self {
        Self::new(ErrorKind::RateLimited { retry_after }, message)
    }

    /// The organization's usage allowance is exhausted.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }

    /// A transport-level connection failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// The request exceeded the configured deadline.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("request timed out after {timeout_ms}ms"),
        )
    }

    /// The service ran but could not satisfy the schema.
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    /// The service is temporarily unavailable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// A halt-on-error batch stopped after its first failure.
    pub fn batch_halted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BatchHalted, message)
    }

    /// Attach the request correlation id reported by the server.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The failure class.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The request correlation id, when the server reported one.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Structured details, when any were captured.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Seconds the server asked the caller to wait before retrying.
    pub fn retry_after(&self) -> Option<f64> {
        match self.kind {
            ErrorKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }

    /// Whether the backoff policy may retry this error.
    ///
    /// Timeouts, connection failures, 429s, and 5xx responses are transient;
    /// everything else propagates on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Timeout
                | ErrorKind::Network
                | ErrorKind::RateLimited { .. }
                | ErrorKind::ServiceUnavailable
        )
    }

    /// Convert into the wire-level error payload used in batch failure lists.
    pub fn to_parse_error(&self) -> ParseError {
        let details = match &self.details {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = Map::new();
                map.insert("details".to_string(), other.clone());
                map
            }
            None => Map::new(),
        };
        ParseError {
            code: self.code(),
            message: self.message.clone(),
            details,
        }
    }
}

impl From<reqwest::Error> for ParseratorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::new(ErrorKind::Timeout, format!("request timed out: {error}"))
        } else {
            Self::network(format!("request failed: {error}"))
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ParseratorError>;
