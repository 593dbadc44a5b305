//! Configuration for the PubMed E-utilities client.

use std::time::Duration;

use crate::error::ConfigError;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the NCBI E-utilities.
    pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

    /// Public landing page for a PubMed record.
    pub const PUBMED_RECORD_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

    /// Tool name reported to NCBI.
    pub const TOOL_NAME: &str = "PaperSurfer";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Requests per second allowed without an API key.
    pub const REQUESTS_PER_SECOND: u32 = 3;

    /// Requests per second allowed with an API key.
    pub const REQUESTS_PER_SECOND_WITH_KEY: u32 = 10;

    /// Retries for transient failures.
    pub const MAX_RETRIES: u32 = 3;

    /// Maximum ids per EFetch request.
    pub const EFETCH_BATCH_SIZE: usize = 200;

    /// Upper bound on ESearch `retmax`.
    pub const MAX_RESULTS_LIMIT: u32 = 10_000;

    /// Cache TTL (1 hour).
    pub const CACHE_TTL: Duration = Duration::from_secs(3600);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 500;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 4;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Client configuration.
#[derive(Clone)]
pub struct Config {
    /// NCBI API key (optional).
    pub api_key: Option<String>,

    /// Contact email sent with every request, as NCBI asks.
    pub email: Option<String>,

    /// Tool name sent with every request.
    pub tool_name: String,

    /// E-utilities base URL (for testing with mock servers).
    pub base_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Request pacing; zero disables the limiter.
    pub requests_per_second: u32,

    /// Retries for transient failures.
    pub max_retries: u32,

    /// Cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size; zero disables caching.
    pub cache_max_size: u64,

    /// Languages appended to every search as a `[Language]` filter.
    pub languages: Vec<String>,
}

impl Config {
    /// Create a new configuration with optional API key and contact email.
    ///
    /// Request pacing follows NCBI's published limits:
    /// - Without key: 3 req/s
    /// - With key: 10 req/s
    #[must_use]
    pub fn new(api_key: Option<String>, email: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let requests_per_second = if api_key.is_some() {
            api::REQUESTS_PER_SECOND_WITH_KEY
        } else {
            api::REQUESTS_PER_SECOND
        };
        Self {
            api_key,
            email: email.filter(|e| !e.trim().is_empty()),
            tool_name: api::TOOL_NAME.to_string(),
            base_url: api::EUTILS_BASE_URL.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            requests_per_second,
            max_retries: api::MAX_RETRIES,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
            languages: vec!["english".to_string()],
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: None,
            email: Some("test@example.com".to_string()),
            tool_name: api::TOOL_NAME.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            requests_per_second: 0, // No pacing in tests
            max_retries: 0,
            cache_ttl: Duration::from_secs(0),
            cache_max_size: 0, // No caching in tests
            languages: Vec::new(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `PUBMED_API_KEY`, `PUBMED_CONTACT_EMAIL`, `PUBMED_TOOL_NAME` and
    /// `PUBMED_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not a valid http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("PUBMED_API_KEY").ok();
        let email = std::env::var("PUBMED_CONTACT_EMAIL").ok();
        let mut config = Self::new(api_key, email);

        if let Ok(tool) = std::env::var("PUBMED_TOOL_NAME") {
            if !tool.trim().is_empty() {
                config.tool_name = tool;
            }
        }
        if let Ok(base) = std::env::var("PUBMED_BASE_URL") {
            config.base_url = base.trim_end_matches('/').to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL parses as http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        Ok(())
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_api_key", &self.has_api_key())
            .field("email", &self.email)
            .field("tool_name", &self.tool_name)
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("max_retries", &self.max_retries)
            .field("languages", &self.languages)
            .finish()
    }
}
