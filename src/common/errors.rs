//! Error types for the analytics core
//!
//! A missing cost basis is *not* an error: it is a documented valid
//! state carried as `Option` in [`crate::analytics::CostBasis`]. The
//! variants here cover provider failures, bad records and bad
//! configuration only.

use thiserror::Error;

/// Result type alias using our CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Upstream data provider unreachable (network or 5xx)
    #[error("data provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Upstream data provider rejected our credentials
    #[error("data provider authentication failed: {0}")]
    ProviderAuth(String),

    /// A record from the provider failed shape validation
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Bad filter bounds, thresholds or provider settings
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Channel send errors
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error counts as a failed fetch for change detection.
    ///
    /// A failed fetch leaves baselines untouched and emits no alert; it
    /// must never be collapsed into a zero-valued observation.
    pub fn is_failed_fetch(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderUnavailable(_)
                | CoreError::ProviderAuth(_)
                | CoreError::HttpRequest(_)
                | CoreError::Timeout(_)
        )
    }
}
