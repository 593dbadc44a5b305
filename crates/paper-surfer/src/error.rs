//! Error types for the paper collector.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Each layer has its own enum: the E-utilities client, the output writer, and
//! configuration. Only configuration errors stop a run.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from the literature API client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error (retry exhaustion included)
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response, or an id missing from a fetch)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// XML parsing error
    #[error("Failed to parse XML response: {0}")]
    Xml(String),

    /// A record came back without the fields it must carry
    #[error("Malformed record: {reason}")]
    Malformed {
        /// What was missing or wrong
        reason: String,
    },

    /// A batched request failed as a whole; reported once per id in the batch
    #[error("Batch request failed: {message}")]
    BatchFailed {
        /// Rendered error of the failed request
        message: String,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create a malformed record error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into() }
    }

    /// Create a batch failure error from the underlying error.
    #[must_use]
    pub fn batch_failed(source: &Self) -> Self {
        Self::BatchFailed { message: source.to_string() }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }

    /// Returns true if the upstream simply has no such record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ClientError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Errors from writing documents to the output tree.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// Filesystem failure (permission denied, disk full, ...)
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being created or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The target file already belongs to a different record
    #[error("{} already holds record {existing}, refusing to overwrite with {incoming}", path.display())]
    Collision {
        /// Conflicting path
        path: PathBuf,
        /// Identifier found in the existing file (empty if unrecognised)
        existing: String,
        /// Identifier of the record being written
        incoming: String,
    },

    /// Document serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutputError {
    /// Wrap an I/O error with the path it happened at.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Configuration errors. Always fatal, always raised before processing.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No usable search keyword was given
    #[error("keyword list is empty")]
    EmptyKeywords,

    /// `max_results` out of range
    #[error("max results must be between 1 and {max}, got {value}")]
    InvalidMaxResults {
        /// Rejected value
        value: u32,
        /// Upper bound
        max: u32,
    },

    /// Invalid field value
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Offending field
        field: String,
        /// Why it was rejected
        message: String,
    },

    /// Settings file could not be read
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// Settings path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for the settings schema
    #[error("cannot parse settings file {}: {source}", path.display())]
    Parse {
        /// Settings path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Create an invalid field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), message: message.into() }
    }
}

/// Errors that stop a collection run before it starts.
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for output operations.
pub type OutputResult<T> = Result<T, OutputError>;
