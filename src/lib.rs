//! # Parserator
//!
//! Async Rust client for the Parserator structured-data extraction API.
//!
//! The crate packages request construction, option merging with
//! explicit-field precedence, automatic retries with exponential backoff,
//! rate limiting, concurrent batch fan-out, and a typed error taxonomy. The
//! parsing itself happens on the remote service; this client speaks its
//! HTTP protocol.
//!
//! ## Features
//!
//! - **Typed requests and responses**: schema-driven parse requests and
//!   normalized responses with confidence and fallback metadata
//! - **Override-wins option merging**: client defaults merge under
//!   per-request overrides, field by explicitly-set field
//! - **Automatic retries**: exponential backoff with jitter for transient
//!   failures (timeouts, connection errors, 429s, 5xx)
//! - **Batch parallelism**: bounded fan-out that preserves input order and
//!   returns per-item failures as data
//! - **Rate limiting**: a requests-per-second gate in front of the transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parserator::{ParseRequest, ParseratorClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ParseratorClient::new("pk_live_your_api_key")?;
//!
//!     let schema = json!({
//!         "name": "string",
//!         "email": "email",
//!         "phone": "phone",
//!     })
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//!     let request = ParseRequest::new(
//!         "John Smith, john@example.com, (555) 123-4567",
//!         schema,
//!     );
//!     let response = client.parse(&request).await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&response.parsed_data)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The client reads its API key from the `PARSERATOR_API_KEY` environment
//! variable via [`ParseratorClient::from_env`], or takes explicit
//! [`ClientConfig`] for base URL, timeout, retry, and rate-limit control.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod limiter;
pub mod options;
pub mod request;
pub mod response;
pub mod retry;
pub mod validate;

// Re-exports for convenience
pub use batch::{BatchOptions, BatchParseResponse};
pub use client::ParseratorClient;
pub use config::{ClientConfig, RetryConfig};
pub use error::{ErrorCode, ErrorKind, ParseError, ParseratorError, Result};
pub use options::{ParseOptions, TuningOptions, TuningOptionsBuilder, ValidationMode};
pub use request::ParseRequest;
pub use response::{
    FallbackFieldUsage, FallbackSummary, FallbackUsage, ParseMetadata, ParseResponse,
};

use serde_json::{Map, Value};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-shot helper: build a client and parse a single input.
///
/// Convenient for scripts and documentation snippets; construct a
/// [`ParseratorClient`] once and reuse it anywhere throughput matters.
pub async fn quick_parse(
    api_key: &str,
    input_data: &str,
    output_schema: Map<String, Value>,
    instructions: Option<&str>,
) -> Result<ParseResponse> {
    let client = ParseratorClient::new(api_key)?;
    let mut request = ParseRequest::new(input_data, output_schema);
    if let Some(instructions) = instructions {
        request = request.with_instructions(instructions);
    }
    client.parse(&request).await
}
