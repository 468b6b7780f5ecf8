//! Error types for ArticleSmith.
//!
//! Library crates use [`ArticleSmithError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Human-readable hint attached to every quota failure.
pub const QUOTA_RETRY_HINT: &str = "API Quota Exceeded. Please try again in 60 seconds.";

/// Top-level error type for all ArticleSmith operations.
#[derive(Debug, thiserror::Error)]
pub enum ArticleSmithError {
    /// Missing or malformed request input (e.g. an article id).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The article store has no record with the requested id.
    #[error("article not found: {id}")]
    NotFound { id: String },

    /// A search or generation service rate-limited us.
    #[error("quota exceeded: {retry_hint}")]
    QuotaExceeded { retry_hint: String },

    /// A single source page could not be fetched or reduced.
    #[error("scrape failed for {url}: {message}")]
    ScrapeFailure { url: String, message: String },

    /// The generative model failed for a non-quota reason.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// The article store rejected a write.
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    /// The listing page contained no usable candidate articles.
    #[error("no candidate articles found at {url}")]
    EmptyListing { url: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Article store read or connection error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ArticleSmithError>;

impl ArticleSmithError {
    /// Create an invalid-request error from any displayable message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    /// Create a not-found error for the given article id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a quota error carrying the standard retry hint.
    pub fn quota_exceeded() -> Self {
        Self::QuotaExceeded {
            retry_hint: QUOTA_RETRY_HINT.to_string(),
        }
    }

    /// Create a per-source scrape failure.
    pub fn scrape(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ScrapeFailure {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a rate-limit signal.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Short machine-readable kind, used in logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::ScrapeFailure { .. } => "scrape_failure",
            Self::GenerationFailure(_) => "generation_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::EmptyListing { .. } => "empty_listing",
            Self::Config { .. } => "config",
            Self::Network(_) => "network",
            Self::Parse { .. } => "parse",
            Self::Storage(_) => "storage",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}
