//! Heimdallr error types

use crate::types::ServiceLevel;

/// Heimdallr error types
#[derive(Debug, thiserror::Error)]
pub enum HeimdallrError {
    // Caller errors
    #[error("authentication required")]
    AuthenticationRequired,

    /// Budget gate rejected the request.
    ///
    /// The `Display` text is the user-visible wording; the service level
    /// that caused the rejection stays on the variant for callers that
    /// want to distinguish emergency throttling from a hard shutoff.
    #[error("service temporarily unavailable for this account")]
    BudgetExceeded { level: ServiceLevel },

    #[error("batch too large: {submitted} items (max {max})")]
    BatchTooLarge { submitted: usize, max: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Upstream/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by completion engine")]
    RateLimited,

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("empty response from completion engine")]
    EmptyResponse,

    /// The durable usage store failed or was unreachable.
    ///
    /// Budget enforcement fails closed: callers must treat this as a
    /// rejection, never as permission to proceed unmetered.
    #[error("usage store unavailable: {0}")]
    StoreUnavailable(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("no completion engine configured")]
    NoEngine,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HeimdallrError {
    /// Whether the error is transient (the same request could succeed
    /// if the caller chose to retry). Retry itself is a caller concern;
    /// this layer only classifies.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HeimdallrError::Http(_)
                | HeimdallrError::RateLimited
                | HeimdallrError::Upstream(_)
                | HeimdallrError::Timeout { .. }
                | HeimdallrError::StoreUnavailable(_)
        )
    }
}

/// Result type alias for Heimdallr operations
pub type Result<T> = std::result::Result<T, HeimdallrError>;
