//! Local validation performed before any network traffic.
//!
//! Every entry point runs these checks first so that invalid input fails
//! fast without consuming rate-limit budget or a network round trip.

use crate::error::{ParseratorError, Result};
use serde_json::{Map, Value};

/// One problem found while validating an output schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Schema key the issue applies to; empty for schema-level issues.
    pub path: String,
    /// What is wrong.
    pub message: String,
}

/// Outcome of validating an output schema before parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaValidationResult {
    /// Whether the schema may be submitted.
    pub valid: bool,
    /// Problems found, in schema order.
    pub errors: Vec<SchemaIssue>,
    /// Hints for fixing the schema.
    pub suggestions: Vec<String>,
}

/// Check an API key's shape and return it trimmed.
pub fn validate_api_key(api_key: &str) -> Result<String> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return Err(ParseratorError::validation(
            "API key must be a non-empty string",
        ));
    }
    Ok(trimmed.to_string())
}

/// Check that input text is non-empty.
pub fn validate_input_data(input_data: &str) -> Result<()> {
    if input_data.trim().is_empty() {
        return Err(ParseratorError::validation(
            "Input data must be a non-empty string",
        ));
    }
    Ok(())
}

/// Lightweight structural validation of an output schema.
pub fn validate_schema(schema: &Map<String, Value>) -> SchemaValidationResult {
    let mut errors = Vec::new();
    let mut suggestions = Vec::new();

    if schema.is_empty() {
        errors.push(SchemaIssue {
            path: String::new(),
            message: "Schema cannot be empty".to_string(),
        });
    }

    for (key, value) in schema {
        if key.trim().is_empty() {
            errors.push(SchemaIssue {
                path: key.clone(),
                message: "Schema keys must be non-empty strings".to_string(),
            });
        }
        if value.is_null() {
            errors.push(SchemaIssue {
                path: key.clone(),
                message: "Schema values cannot be null".to_string(),
            });
        }
    }

    if !errors.is_empty() {
        suggestions.push("Review schema keys and values for correctness".to_string());
    }

    SchemaValidationResult {
        valid: errors.is_empty(),
        errors,
        suggestions,
    }
}

/// Validate a schema and convert a failed result into a typed error.
pub fn ensure_valid_schema(schema: &Map<String, Value>) -> Result<()> {
    let result = validate_schema(schema);
    if result.valid {
        return Ok(());
    }
    let details = serde_json::json!({
        "errors": result
            .errors
            .iter()
            .map(|issue| serde_json::json!({"path": issue.path, "message": issue.message}))
            .collect::<Vec<_>>(),
        "suggestions": result.suggestions,
    });
    Err(ParseratorError::validation("Schema validation failed").with_details(details))
}
