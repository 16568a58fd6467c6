//! Parse request construction and wire payload building.

use crate::options::ParseOptions;
use serde_json::{Map, Value};

/// One unit of parse work: input text, target schema, and optional
/// instructions and option overrides. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseRequest {
    input_data: String,
    output_schema: Map<String, Value>,
    instructions: Option<String>,
    options: Option<ParseOptions>,
}

impl ParseRequest {
    /// Create a request from input text and an output schema.
    ///
    /// Validation of the text and schema happens when the request is
    /// submitted, before any network activity.
    pub fn new(input_data: impl Into<String>, output_schema: Map<String, Value>) -> Self {
        Self {
            input_data: input_data.into(),
            output_schema,
            instructions: None,
            options: None,
        }
    }

    /// Attach free-form instructions forwarded to the API.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Attach per-request option overrides.
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The raw input text.
    pub fn input_data(&self) -> &str {
        &self.input_data
    }

    /// The output schema mapping.
    pub fn output_schema(&self) -> &Map<String, Value> {
        &self.output_schema
    }

    /// Instructions, if any.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Per-request option overrides, if any.
    pub fn options(&self) -> Option<&ParseOptions> {
        self.options.as_ref()
    }

    /// Build the wire payload for the parse endpoint.
    ///
    /// The options sub-object is included only when the merged options carry
    /// at least one explicit value.
    pub(crate) fn to_payload(&self, effective_options: &ParseOptions) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "inputData".to_string(),
            Value::String(self.input_data.clone()),
        );
        payload.insert(
            "outputSchema".to_string(),
            Value::Object(self.output_schema.clone()),
        );
        if let Some(instructions) = &self.instructions {
            payload.insert(
                "instructions".to_string(),
                Value::String(instructions.clone()),
            );
        }
        if !effective_options.is_empty() {
            payload.insert(
                "options".to_string(),
                serde_json::to_value(effective_options).unwrap_or_default(),
            );
        }
        Value::Object(payload)
    }
}
