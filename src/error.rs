//! Scan error taxonomy
//!
//! Nothing here is fatal to an overall scan except invalid parameters and
//! user cancellation. Providers that fail are skipped, rate limits are
//! retried with backoff, bad data rejects a single ticker, and cache I/O
//! failures degrade to an uncached scan.

use thiserror::Error;

/// Errors produced by the scanning pipeline
#[derive(Debug, Error)]
pub enum ScanError {
    /// Scan parameters failed validation (raised before any I/O)
    #[error("invalid scan parameters: {0}")]
    InvalidParams(String),

    /// Provider could not be reached or initialized
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Upstream API signalled a quota/rate limit
    #[error("rate limited by upstream")]
    RateLimited,

    /// Authentication or authorization failure
    #[error("authentication failed")]
    Auth,

    /// Data for a single ticker is unusable (insufficient history,
    /// invalid OHLC relationships, zero volume, stale)
    #[error("data quality: {0}")]
    DataQuality(String),

    /// Cache file could not be read or written
    #[error("cache I/O: {0}")]
    CacheIo(String),

    /// Per-task timeout elapsed
    #[error("task timed out")]
    Timeout,

    /// HTTP transport failure
    #[error("http: {0}")]
    Http(String),

    /// User interrupted the scan
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Whether the backoff policy should retry this error at all
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::RateLimited | ScanError::Auth | ScanError::Http(_) | ScanError::Timeout
        )
    }

    /// Whether this error aborts the whole scan instead of a single unit
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::InvalidParams(_) | ScanError::Cancelled)
    }

    /// Classify an HTTP status into the taxonomy
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ScanError::RateLimited
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            ScanError::Auth
        } else {
            ScanError::Http(format!("status {}", status))
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout
        } else if let Some(status) = err.status() {
            ScanError::from_status(status)
        } else {
            ScanError::Http(err.to_string())
        }
    }
}
