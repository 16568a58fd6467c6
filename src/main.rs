//! Parserator CLI - parse unstructured text from the command line.
//!
//! Run `parserator --help` for usage information.

use anyhow::Context;
use clap::Parser;
use console::style;
use parserator::response::ParseResponse;
use parserator::{ParseOptions, ParseRequest, ParseratorClient, ParseratorError, ValidationMode};
use serde_json::{Map, Value};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Level, error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 1;
const EXIT_API: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for the Parserator client.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parserator",
    version,
    about = "Parse unstructured text into structured JSON via the Parserator API",
    after_help = "EXAMPLES:\n    \
        parserator \"John Smith, john@example.com\" --schema contact.json\n    \
        parserator --input-file email.txt --schema invoice.json --include-metadata\n    \
        cat notes.txt | parserator --schema todo.json --locale en-US"
)]
struct Args {
    /// Text to parse; reads --input-file or standard input when omitted
    input_text: Option<String>,

    /// Path to a JSON file describing the desired output schema
    #[arg(short, long)]
    schema: PathBuf,

    /// Read the text to parse from a file
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Additional instructions forwarded to the API
    #[arg(long)]
    instructions: Option<String>,

    /// API key; falls back to the environment variable when omitted
    #[arg(short, long)]
    api_key: Option<String>,

    /// Environment variable holding the API key
    #[arg(long, default_value = parserator::config::DEFAULT_ENV_VAR)]
    env_var: String,

    /// Validation strategy for parsing results
    #[arg(long, value_parser = ["strict", "lenient"])]
    validation: Option<String>,

    /// Locale hint forwarded to the API
    #[arg(long)]
    locale: Option<String>,

    /// Timezone hint forwarded to the API
    #[arg(long)]
    timezone: Option<String>,

    /// Maximum number of automatic retries performed by the API
    #[arg(long)]
    max_retries: Option<u32>,

    /// Include response metadata in the printed JSON output
    #[arg(long)]
    include_metadata: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "PARSERATOR_VERBOSE")]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, env = "PARSERATOR_JSON_LOGS")]
    json_logs: bool,
}

/// Failures split by exit code: user input vs the API.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0:#}")]
    Usage(#[from] anyhow::Error),
    #[error(transparent)]
    Api(#[from] ParseratorError),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let code = tokio::select! {
        code = run(&args) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Aborted by user.");
            EXIT_INTERRUPTED
        }
    };
    std::process::exit(code);
}

async fn run(args: &Args) -> i32 {
    match execute(args).await {
        Ok(output) => {
            println!("{output}");
            EXIT_OK
        }
        Err(CliError::Usage(err)) => {
            error!("invalid usage: {err:#}");
            eprintln!("{} {err:#}", style("error:").red().bold());
            EXIT_USAGE
        }
        Err(CliError::Api(err)) => {
            error!(code = err.code().as_str(), "API request failed: {err}");
            eprintln!(
                "{} [{}] {err}",
                style("Parserator API error:").red().bold(),
                err.code().as_str()
            );
            if let Some(request_id) = err.request_id() {
                eprintln!("  request id: {request_id}");
            }
            EXIT_API
        }
    }
}

async fn execute(args: &Args) -> Result<String, CliError> {
    let input_text = load_input_text(args)?;
    let schema = load_schema(&args.schema)?;
    let options = build_options(args);
    let client = create_client(args)?;

    let mut request = ParseRequest::new(input_text, schema);
    if let Some(instructions) = &args.instructions {
        request = request.with_instructions(instructions);
    }
    if let Some(options) = options {
        request = request.with_options(options);
    }

    let response = client.parse(&request).await?;
    Ok(format_output(&response, args.include_metadata))
}

fn load_input_text(args: &Args) -> Result<String, CliError> {
    if let Some(path) = &args.input_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file '{}'", path.display()))?;
        return Ok(text);
    }

    if let Some(text) = &args.input_text {
        return Ok(text.clone());
    }

    if !std::io::stdin().is_terminal() {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read standard input")?;
        if !buffer.is_empty() {
            return Ok(buffer);
        }
    }

    Err(CliError::Usage(anyhow::anyhow!(
        "no input text provided: pass it as an argument, use --input-file, or pipe via stdin"
    )))
}

fn load_schema(path: &Path) -> Result<Map<String, Value>, CliError> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file '{}'", path.display()))?;
    let payload: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to decode JSON schema '{}'", path.display()))?;
    let schema = payload
        .as_object()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("schema file must contain a JSON object"))?;

    // Schema problems are user input problems, not API failures.
    parserator::validate::ensure_valid_schema(&schema)
        .map_err(|e| CliError::Usage(anyhow::Error::new(e)))?;
    Ok(schema)
}

fn build_options(args: &Args) -> Option<ParseOptions> {
    let mut options = ParseOptions::new();
    if let Some(validation) = args.validation.as_deref() {
        let mode = match validation {
            "lenient" => ValidationMode::Lenient,
            _ => ValidationMode::Strict,
        };
        options = options.with_validation(mode);
    }
    if let Some(locale) = &args.locale {
        options = options.with_locale(locale);
    }
    if let Some(timezone) = &args.timezone {
        options = options.with_timezone(timezone);
    }
    if let Some(max_retries) = args.max_retries {
        options = options.with_max_retries(max_retries);
    }
    (!options.is_empty()).then_some(options)
}

fn create_client(args: &Args) -> Result<ParseratorClient, CliError> {
    let client = match &args.api_key {
        Some(api_key) => ParseratorClient::new(api_key.clone()),
        None => ParseratorClient::from_env_var(&args.env_var),
    };
    // A missing or malformed key is a user input problem.
    client.map_err(|e| CliError::Usage(anyhow::anyhow!("{}", e.message())))
}

fn format_output(response: &ParseResponse, include_metadata: bool) -> String {
    let mut payload = Map::new();
    payload.insert(
        "data".to_string(),
        response
            .parsed_data
            .clone()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Map::new())),
    );
    if include_metadata {
        payload.insert(
            "metadata".to_string(),
            Value::Object(response.metadata.raw.clone()),
        );
    }
    serde_json::to_string_pretty(&Value::Object(payload)).unwrap_or_default()
}

fn setup_logging(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parserator={level}")));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            )
            .init();
    }
}
