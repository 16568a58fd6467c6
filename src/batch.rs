//! Concurrent batch scheduling with partial-failure semantics.
//!
//! The scheduler fans requests out over a bounded number of in-flight
//! futures. Every outcome is written back to its original index, so the
//! result order always equals the input order regardless of completion
//! order. Per-item failures are converted into failure responses and
//! collected; they never abort the batch. Only the halt-on-error path
//! raises, and only with the batch-halted error.

use crate::error::{ParseError, ParseratorError, Result};
use crate::request::ParseRequest;
use crate::response::{ParseMetadata, ParseResponse};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tuning for a batch parse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    parallelism: usize,
    halt_on_error: bool,
}

impl BatchOptions {
    /// Options with the given parallelism; rejects zero.
    pub fn new(parallelism: usize) -> Result<Self> {
        if parallelism == 0 {
            return Err(ParseratorError::validation(
                "parallelism must be at least 1",
            ));
        }
        Ok(Self {
            parallelism,
            halt_on_error: false,
        })
    }

    /// Stop dispatching after the first failure and raise a batch-halted
    /// error.
    #[must_use]
    pub fn with_halt_on_error(mut self, halt_on_error: bool) -> Self {
        self.halt_on_error = halt_on_error;
        self
    }

    /// Configured worker ceiling.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Whether the batch halts on the first failure.
    pub fn halt_on_error(&self) -> bool {
        self.halt_on_error
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallelism: 4,
            halt_on_error: false,
        }
    }
}

/// Aggregated outcome of a batch parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchParseResponse {
    /// Per-request responses in input order.
    pub results: Vec<ParseResponse>,
    /// Structured failures ordered by ascending original index.
    #[serde(default)]
    pub failed: Vec<ParseError>,
}

/// Run every request through `run`, honoring the batch options.
pub(crate) async fn execute<F, Fut>(
    requests: Vec<ParseRequest>,
    options: &BatchOptions,
    run: F,
) -> Result<BatchParseResponse>
where
    F: Fn(ParseRequest) -> Fut,
    Fut: Future<Output = Result<ParseResponse>>,
{
    if requests.is_empty() {
        return Ok(BatchParseResponse::default());
    }
    if options.halt_on_error() {
        return execute_sequential(requests, run).await;
    }

    let total = requests.len();
    let workers = options.parallelism().min(total).max(1);
    let mut results: Vec<Option<ParseResponse>> = Vec::with_capacity(total);
    results.resize_with(total, || None);
    let mut failures: Vec<(usize, ParseError)> = Vec::new();

    let mut outcomes = stream::iter(requests.into_iter().enumerate())
        .map(|(index, request)| {
            let outcome = run(request);
            async move { (index, outcome.await) }
        })
        .buffer_unordered(workers);

    while let Some((index, outcome)) = outcomes.next().await {
        match outcome {
            Ok(response) => results[index] = Some(response),
            Err(error) => {
                warn!(index, code = error.code().as_str(), "batch request failed");
                failures.push((index, error.to_parse_error()));
                results[index] = Some(failure_response(&error));
            }
        }
    }
    drop(outcomes);

    failures.sort_unstable_by_key(|(index, _)| *index);
    Ok(BatchParseResponse {
        results: results.into_iter().flatten().collect(),
        failed: failures.into_iter().map(|(_, error)| error).collect(),
    })
}

/// Strict in-order execution; stops dispatching at the first failure.
async fn execute_sequential<F, Fut>(requests: Vec<ParseRequest>, run: F) -> Result<BatchParseResponse>
where
    F: Fn(ParseRequest) -> Fut,
    Fut: Future<Output = Result<ParseResponse>>,
{
    let mut response = BatchParseResponse::default();
    for (index, request) in requests.into_iter().enumerate() {
        match run(request).await {
            Ok(result) => response.results.push(result),
            Err(error) => {
                warn!(
                    index,
                    code = error.code().as_str(),
                    "halting batch on first failure"
                );
                let request_id = error.request_id().map(str::to_string);
                response.results.push(failure_response(&error));
                response.failed.push(error.to_parse_error());

                let message = match &request_id {
                    Some(id) => format!("batch halted: request {index} failed (request id {id})"),
                    None => format!("batch halted: request {index} failed"),
                };
                let details = serde_json::json!({
                    "failedIndex": index,
                    "partialResponse": serde_json::to_value(&response).unwrap_or_default(),
                });
                return Err(ParseratorError::batch_halted(message)
                    .with_request_id(request_id)
                    .with_details(details));
            }
        }
    }
    Ok(response)
}

/// Convert a per-item error into the failure response stored at its index.
fn failure_response(error: &ParseratorError) -> ParseResponse {
    ParseResponse {
        success: false,
        parsed_data: None,
        error_message: Some(error.message().to_string()),
        metadata: ParseMetadata {
            request_id: error.request_id().map(str::to_string),
            ..ParseMetadata::default()
        },
        error: Some(error.to_parse_error()),
    }
}
