//! Client configuration with environment fallbacks and sensible defaults.

use crate::error::{ParseratorError, Result};
use crate::limiter;
use crate::options::ParseOptions;
use crate::validate::validate_api_key;
use std::num::NonZeroU32;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.parserator.com";

/// Environment variable consulted for the API key by default.
pub const DEFAULT_ENV_VAR: &str = "PARSERATOR_API_KEY";

/// Environment variable that overrides the base URL when set.
pub const BASE_URL_ENV_VAR: &str = "PARSERATOR_BASE_URL";

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL of the API.
    pub base_url: String,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Outbound requests-per-second ceiling.
    pub rate_limit: u32,
    /// Local retry settings for transient failures.
    pub retry: RetryConfig,
    /// Options merged under every request's overrides.
    pub default_options: Option<ParseOptions>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: limiter::DEFAULT_REQUESTS_PER_SECOND.get(),
            retry: RetryConfig::default(),
            default_options: None,
        }
    }

    /// Read the API key from [`DEFAULT_ENV_VAR`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(DEFAULT_ENV_VAR)
    }

    /// Read the API key from a named environment variable.
    ///
    /// [`BASE_URL_ENV_VAR`] overrides the base URL when present.
    pub fn from_env_var(name: &str) -> Result<Self> {
        let api_key = std::env::var(name).map_err(|_| {
            ParseratorError::validation(format!(
                "API key not found: set the {name} environment variable"
            ))
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV_VAR) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        Ok(config)
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the requests-per-second ceiling.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Override the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set options merged under every request's overrides.
    #[must_use]
    pub fn with_default_options(mut self, options: ParseOptions) -> Self {
        self.default_options = Some(options);
        self
    }

    /// Validate the configuration, normalizing the API key.
    pub fn validate(&mut self) -> Result<()> {
        self.api_key = validate_api_key(&self.api_key)?;
        if self.base_url.trim().is_empty() {
            return Err(ParseratorError::validation("base URL cannot be empty"));
        }
        if self.rate_limit == 0 {
            return Err(ParseratorError::validation(
                "rate limit must be greater than 0",
            ));
        }
        Ok(())
    }

    /// The rate ceiling as a `NonZeroU32` for the request gate.
    pub fn rate_limit_nonzero(&self) -> NonZeroU32 {
        NonZeroU32::new(self.rate_limit).unwrap_or(NonZeroU32::MIN)
    }
}

/// Local retry settings for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling for the backoff delay.
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}
