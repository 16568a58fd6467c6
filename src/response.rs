//! Response normalization for the parse endpoint.
//!
//! Bodies are treated leniently: a malformed or non-JSON body degrades to an
//! empty mapping, numeric metadata defaults to zero, and a fallback summary
//! that fails to parse is simply absent. The HTTP status, not the body
//! shape, decides the error kind.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message used when a failed body carries no message of its own.
pub(crate) const DEFAULT_FAILURE_MESSAGE: &str = "Parse operation failed";

/// Structured result of a parse call.
///
/// When `success` is false the transport guarantees that `error_message` or
/// `error` is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    /// Whether the service satisfied the request.
    pub success: bool,
    /// The extracted data, keyed by schema field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<Map<String, Value>>,
    /// Failure description supplied by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// How the request was processed.
    #[serde(default)]
    pub metadata: ParseMetadata,
    /// Structured error, when the service returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
}

impl ParseResponse {
    /// Normalize a response body into a structured result.
    ///
    /// `header_request_id` is the correlation id from the response header; it
    /// is preferred over a body-embedded id.
    pub(crate) fn from_body(body: Value, header_request_id: Option<String>) -> Self {
        let body = body.as_object().cloned().unwrap_or_default();
        let success = body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let parsed_data = body.get("parsedData").and_then(Value::as_object).cloned();
        let mut error_message = body
            .get("errorMessage")
            .and_then(Value::as_str)
            .map(str::to_string);
        let error = body
            .get("error")
            .and_then(|value| serde_json::from_value::<ParseError>(value.clone()).ok());
        let metadata = ParseMetadata::from_value(body.get("metadata"), header_request_id);

        if !success && error_message.is_none() && error.is_none() {
            error_message = Some(DEFAULT_FAILURE_MESSAGE.to_string());
        }

        Self {
            success,
            parsed_data,
            error_message,
            metadata,
            error,
        }
    }
}

/// Metadata describing how a parse request was processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    /// Overall extraction confidence; zero when the service omitted it.
    #[serde(default)]
    pub confidence: f64,
    /// Server-side processing time in milliseconds; zero when omitted.
    #[serde(default)]
    pub processing_time_ms: u64,
    /// Request correlation id, preferred from the response header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Secondary-resolver usage, when the service reported any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackSummary>,
    /// The raw metadata mapping as received.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl ParseMetadata {
    fn from_value(value: Option<&Value>, header_request_id: Option<String>) -> Self {
        let raw = value.and_then(Value::as_object).cloned().unwrap_or_default();
        let confidence = raw
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let processing_time_ms = raw
            .get("processingTimeMs")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let request_id = header_request_id.or_else(|| {
            raw.get("requestId")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let fallback = raw.get("fallback").and_then(FallbackSummary::from_value);

        Self {
            confidence,
            processing_time_ms,
            request_id,
            fallback,
            raw,
        }
    }
}

/// Fallback usage across the service's resolver strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSummary {
    /// Usage of the lean LLM resolver, when it was consulted.
    #[serde(default, rename = "leanLLM", skip_serializing_if = "Option::is_none")]
    pub lean_llm: Option<FallbackUsage>,
    /// The raw fallback mapping as received.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl FallbackSummary {
    fn from_value(value: &Value) -> Option<Self> {
        let raw = value.as_object()?.clone();
        let lean_llm = raw.get("leanLLM").and_then(FallbackUsage::from_value);
        Some(Self { lean_llm, raw })
    }
}

/// Aggregate accounting of the secondary resolver for one parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackUsage {
    /// Resolver invocations across all fields.
    pub total_invocations: u32,
    /// Fields the resolver filled in.
    pub resolved_fields: u32,
    /// Resolutions reused from earlier fields.
    pub reused_resolutions: u32,
    /// Fields skipped because the planner was already confident.
    pub skipped_by_plan_confidence: u32,
    /// Fields skipped because a per-parse limit was reached.
    pub skipped_by_limits: u32,
    /// Extractions shared across related fields.
    pub shared_extractions: u32,
    /// Tokens spent by the resolver.
    pub total_tokens: u64,
    /// Planner-confidence gate in effect, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_confidence_gate: Option<f64>,
    /// Invocation ceiling in effect, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_invocations_per_parse: Option<u32>,
    /// Token ceiling in effect, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_parse: Option<u32>,
    /// Per-field resolver activity.
    pub fields: Vec<FallbackFieldUsage>,
    /// The raw usage mapping as received.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl FallbackUsage {
    fn from_value(value: &Value) -> Option<Self> {
        let mut usage: Self = serde_json::from_value(value.clone()).ok()?;
        usage.raw = value.as_object().cloned().unwrap_or_default();
        if let Some(entries) = value.get("fields").and_then(Value::as_array) {
            for (field, entry) in usage.fields.iter_mut().zip(entries) {
                field.raw = entry.as_object().cloned().unwrap_or_default();
            }
        }
        Some(usage)
    }
}

/// Per-field record of secondary-resolver activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackFieldUsage {
    /// Schema field the record applies to.
    pub field: String,
    /// What the resolver did: invoked, reused, skipped.
    pub action: String,
    /// Whether the field was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Confidence of the resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Tokens spent on this field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Why the resolver acted as it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Field whose resolution was reused, for reuse actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    /// Sibling fields that shared this extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_keys: Option<Vec<String>>,
    /// Planner confidence at decision time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planner_confidence: Option<f64>,
    /// Gate the planner confidence was compared against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<f64>,
    /// Error reported for this field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Which limit was hit, for limit skips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_type: Option<String>,
    /// The limit value that was hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Invocation count when the limit was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_invocations: Option<u32>,
    /// Token count when the limit was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tokens: Option<u32>,
    /// The raw field record as received.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}
