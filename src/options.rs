//! Parse options with explicit-field tracking and merge semantics.
//!
//! Every field on [`ParseOptions`] and [`TuningOptions`] is an `Option`: a
//! `Some` value means the caller explicitly supplied the field, `None` means
//! it was left at the library default. That distinction drives the merge
//! rule: an override wins only for the fields it explicitly set.

use crate::error::{ParseratorError, Result};
use serde::{Deserialize, Serialize};

/// Validation strategy applied by the remote parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject responses that do not match the schema exactly.
    #[default]
    Strict,
    /// Accept best-effort responses.
    Lenient,
}

impl ValidationMode {
    /// The wire representation of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// Optional parameters that tweak a parse call.
///
/// A default-constructed value has an empty explicit-field set: merging it
/// over any other options leaves them unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_retries: Option<u32>,
    #[serde(rename = "leanLLM", skip_serializing_if = "tuning_is_unset")]
    tuning: Option<TuningOptions>,
}

fn tuning_is_unset(tuning: &Option<TuningOptions>) -> bool {
    tuning.as_ref().is_none_or(TuningOptions::is_empty)
}

impl ParseOptions {
    /// Options with nothing explicitly set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly set the validation mode.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Explicitly set the locale hint.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Explicitly set the timezone hint.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Explicitly set the retry budget the API applies server-side.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Explicitly set the runtime tuning block.
    #[must_use]
    pub fn with_tuning(mut self, tuning: TuningOptions) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Effective validation mode (library default: strict).
    pub fn validation(&self) -> ValidationMode {
        self.validation.unwrap_or_default()
    }

    /// Explicit locale hint, if any.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Explicit timezone hint, if any.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Effective server-side retry budget (library default: 3).
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }

    /// Explicit runtime tuning block, if any.
    pub fn tuning(&self) -> Option<&TuningOptions> {
        self.tuning.as_ref()
    }

    /// Whether the explicit-field set is empty.
    pub fn is_empty(&self) -> bool {
        self.validation.is_none()
            && self.locale.is_none()
            && self.timezone.is_none()
            && self.max_retries.is_none()
            && self.tuning.is_none()
    }

    /// Merge client defaults with a per-request override.
    ///
    /// The override wins for exactly the fields it explicitly set; fields it
    /// left unset keep the default's value even when the library would supply
    /// its own default for them. An override with an empty explicit-field
    /// set returns the default unchanged. The nested tuning block merges
    /// recursively under the same rule. Deterministic and side-effect free;
    /// numeric ranges were validated at construction and are not re-checked.
    pub fn merge(default: Option<&Self>, overrides: Option<&Self>) -> Self {
        match (default, overrides) {
            (None, None) => Self::default(),
            (Some(default), None) => default.clone(),
            (None, Some(overrides)) => overrides.clone(),
            (Some(default), Some(overrides)) => {
                if overrides.is_empty() {
                    return default.clone();
                }
                let mut merged = default.clone();
                if overrides.validation.is_some() {
                    merged.validation = overrides.validation;
                }
                if overrides.locale.is_some() {
                    merged.locale = overrides.locale.clone();
                }
                if overrides.timezone.is_some() {
                    merged.timezone = overrides.timezone.clone();
                }
                if overrides.max_retries.is_some() {
                    merged.max_retries = overrides.max_retries;
                }
                if let Some(tuning) = &overrides.tuning {
                    merged.tuning = Some(match &default.tuning {
                        Some(base) => base.merge(tuning),
                        None => tuning.clone(),
                    });
                }
                merged
            }
        }
    }
}

/// Runtime controls for the remote service's secondary field resolver.
///
/// Confidence values are validated into `[0, 1]` by
/// [`TuningOptionsBuilder::build`]; counts are non-negative by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_optional_fields: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_input_characters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_confidence_gate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_invocations_per_parse: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens_per_parse: Option<u32>,
}

impl TuningOptions {
    /// Start building a tuning block.
    pub fn builder() -> TuningOptionsBuilder {
        TuningOptionsBuilder::default()
    }

    /// Whether the resolver is disabled, if explicitly set.
    pub fn disabled(&self) -> Option<bool> {
        self.disabled
    }

    /// Whether optional fields may be resolved, if explicitly set.
    pub fn allow_optional_fields(&self) -> Option<bool> {
        self.allow_optional_fields
    }

    /// Confidence assigned to resolutions without one, if explicitly set.
    pub fn default_confidence(&self) -> Option<f64> {
        self.default_confidence
    }

    /// Input-size ceiling handed to the resolver, if explicitly set.
    pub fn max_input_characters(&self) -> Option<u32> {
        self.max_input_characters
    }

    /// Planner-confidence gate below which the resolver runs, if set.
    pub fn plan_confidence_gate(&self) -> Option<f64> {
        self.plan_confidence_gate
    }

    /// Per-parse invocation ceiling, if explicitly set.
    pub fn max_invocations_per_parse(&self) -> Option<u32> {
        self.max_invocations_per_parse
    }

    /// Per-parse token ceiling, if explicitly set.
    pub fn max_tokens_per_parse(&self) -> Option<u32> {
        self.max_tokens_per_parse
    }

    /// Whether the explicit-field set is empty.
    pub fn is_empty(&self) -> bool {
        self.disabled.is_none()
            && self.allow_optional_fields.is_none()
            && self.default_confidence.is_none()
            && self.max_input_characters.is_none()
            && self.plan_confidence_gate.is_none()
            && self.max_invocations_per_parse.is_none()
            && self.max_tokens_per_parse.is_none()
    }

    /// Field-by-field union with the override's explicit fields winning.
    ///
    /// An override with an empty explicit-field set leaves `self` unchanged.
    pub fn merge(&self, overrides: &Self) -> Self {
        if overrides.is_empty() {
            return self.clone();
        }
        Self {
            disabled: overrides.disabled.or(self.disabled),
            allow_optional_fields: overrides.allow_optional_fields.or(self.allow_optional_fields),
            default_confidence: overrides.default_confidence.or(self.default_confidence),
            max_input_characters: overrides.max_input_characters.or(self.max_input_characters),
            plan_confidence_gate: overrides.plan_confidence_gate.or(self.plan_confidence_gate),
            max_invocations_per_parse: overrides
                .max_invocations_per_parse
                .or(self.max_invocations_per_parse),
            max_tokens_per_parse: overrides.max_tokens_per_parse.or(self.max_tokens_per_parse),
        }
    }
}

/// Builder for [`TuningOptions`]; [`build`](Self::build) validates ranges.
#[derive(Debug, Clone, Default)]
pub struct TuningOptionsBuilder {
    tuning: TuningOptions,
}

impl TuningOptionsBuilder {
    /// Disable or enable the secondary resolver.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.tuning.disabled = Some(disabled);
        self
    }

    /// Allow the resolver to fill optional fields.
    #[must_use]
    pub fn allow_optional_fields(mut self, allow: bool) -> Self {
        self.tuning.allow_optional_fields = Some(allow);
        self
    }

    /// Confidence assigned to resolutions that do not report one.
    #[must_use]
    pub fn default_confidence(mut self, confidence: f64) -> Self {
        self.tuning.default_confidence = Some(confidence);
        self
    }

    /// Cap the input size handed to the resolver.
    #[must_use]
    pub fn max_input_characters(mut self, max: u32) -> Self {
        self.tuning.max_input_characters = Some(max);
        self
    }

    /// Planner-confidence threshold below which the resolver runs.
    #[must_use]
    pub fn plan_confidence_gate(mut self, gate: f64) -> Self {
        self.tuning.plan_confidence_gate = Some(gate);
        self
    }

    /// Cap resolver invocations per parse.
    #[must_use]
    pub fn max_invocations_per_parse(mut self, max: u32) -> Self {
        self.tuning.max_invocations_per_parse = Some(max);
        self
    }

    /// Cap resolver token spend per parse.
    #[must_use]
    pub fn max_tokens_per_parse(mut self, max: u32) -> Self {
        self.tuning.max_tokens_per_parse = Some(max);
        self
    }

    /// Validate numeric ranges and produce the tuning block.
    pub fn build(self) -> Result<TuningOptions> {
        validate_confidence("default_confidence", self.tuning.default_confidence)?;
        validate_confidence("plan_confidence_gate", self.tuning.plan_confidence_gate)?;
        Ok(self.tuning)
    }
}

fn validate_confidence(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(value) if !value.is_finite() || !(0.0..=1.0).contains(&value) => Err(
            ParseratorError::validation(format!("{field} must be within [0, 1]")),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_defaults() -> ParseOptions {
        ParseOptions::new()
            .with_validation(ValidationMode::Lenient)
            .with_locale("en-US")
            .with_max_retries(5)
    }

    #[test]
    fn default_instance_has_empty_explicit_set() {
        assert!(ParseOptions::default().is_empty());
        assert!(TuningOptions::default().is_empty());
    }

    #[test]
    fn merge_with_empty_override_returns_default() {
        let default = sample_defaults();
        let merged = ParseOptions::merge(Some(&default), Some(&ParseOptions::new()));
        assert_eq!(merged, default);
    }

    #[test]
    fn merge_with_absent_override_returns_default() {
        let default = sample_defaults();
        assert_eq!(ParseOptions::merge(Some(&default), None), default);
        assert_eq!(ParseOptions::merge(None, None), ParseOptions::default());
    }

    #[test]
    fn explicit_override_fields_win_others_are_retained() {
        let default = sample_defaults();
        let overrides = ParseOptions::new().with_locale("de-DE");
        let merged = ParseOptions::merge(Some(&default), Some(&overrides));

        assert_eq!(merged.locale(), Some("de-DE"));
        assert_eq!(merged.validation(), ValidationMode::Lenient);
        assert_eq!(merged.max_retries(), 5);
    }

    #[test]
    fn library_default_in_override_does_not_clobber() {
        // Strict is the library default; setting it explicitly must still win.
        let default = sample_defaults();
        let overrides = ParseOptions::new().with_validation(ValidationMode::Strict);
        let merged = ParseOptions::merge(Some(&default), Some(&overrides));
        assert_eq!(merged.validation(), ValidationMode::Strict);

        // But an override that never touched validation keeps the default's.
        let overrides = ParseOptions::new().with_timezone("UTC");
        let merged = ParseOptions::merge(Some(&default), Some(&overrides));
        assert_eq!(merged.validation(), ValidationMode::Lenient);
    }

    #[test]
    fn merge_is_idempotent_and_does_not_mutate_inputs() {
        let default = sample_defaults();
        let overrides = ParseOptions::new().with_timezone("UTC");
        let default_before = default.clone();
        let overrides_before = overrides.clone();

        let first = ParseOptions::merge(Some(&default), Some(&overrides));
        let second = ParseOptions::merge(Some(&default), Some(&overrides));

        assert_eq!(first, second);
        assert_eq!(default, default_before);
        assert_eq!(overrides, overrides_before);
    }

    #[test]
    fn tuning_merges_field_by_field() {
        let base = TuningOptions::builder()
            .default_confidence(0.8)
            .max_invocations_per_parse(3)
            .build()
            .unwrap();
        let overrides = TuningOptions::builder()
            .max_invocations_per_parse(1)
            .build()
            .unwrap();

        let merged = base.merge(&overrides);
        assert_eq!(merged.default_confidence(), Some(0.8));
        assert_eq!(merged.max_invocations_per_parse(), Some(1));
    }

    #[test]
    fn empty_tuning_override_keeps_default_block() {
        let base_tuning = TuningOptions::builder()
            .plan_confidence_gate(0.4)
            .build()
            .unwrap();
        let default = ParseOptions::new().with_tuning(base_tuning.clone());
        let overrides = ParseOptions::new().with_tuning(TuningOptions::default());

        let merged = ParseOptions::merge(Some(&default), Some(&overrides));
        assert_eq!(merged.tuning(), Some(&base_tuning));
    }

    #[test]
    fn builder_rejects_out_of_range_confidence() {
        assert!(TuningOptions::builder().default_confidence(1.5).build().is_err());
        assert!(TuningOptions::builder().default_confidence(-0.1).build().is_err());
        assert!(TuningOptions::builder().plan_confidence_gate(f64::NAN).build().is_err());
        assert!(TuningOptions::builder().plan_confidence_gate(0.0).build().is_ok());
        assert!(TuningOptions::builder().default_confidence(1.0).build().is_ok());
    }

    #[test]
    fn serializes_with_wire_key_names() {
        let tuning = TuningOptions::builder()
            .allow_optional_fields(true)
            .default_confidence(0.5)
            .max_tokens_per_parse(200)
            .build()
            .unwrap();
        let options = ParseOptions::new()
            .with_validation(ValidationMode::Lenient)
            .with_max_retries(2)
            .with_tuning(tuning);

        let wire = serde_json::to_value(&options).unwrap();
        assert_eq!(wire["validation"], "lenient");
        assert_eq!(wire["maxRetries"], 2);
        assert_eq!(wire["leanLLM"]["allowOptionalFields"], true);
        assert_eq!(wire["leanLLM"]["defaultConfidence"], 0.5);
        assert_eq!(wire["leanLLM"]["maxTokensPerParse"], 200);
        assert!(wire.get("locale").is_none());
    }

    #[test]
    fn empty_tuning_block_is_omitted_from_the_wire() {
        let options = ParseOptions::new()
            .with_max_retries(1)
            .with_tuning(TuningOptions::default());
        let wire = serde_json::to_value(&options).unwrap();
        assert!(wire.get("leanLLM").is_none());
    }
}
