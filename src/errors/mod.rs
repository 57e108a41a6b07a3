//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ErrorKind`]: Classification used for metrics labels and adapter health

mod kind;

pub use kind::ErrorKind;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into an [`ErrorKind`] via the [`kind`](Self::kind)
/// method. The service uses the classification to label metrics records and to
/// flag adapters that reported a vendor rate limit; it never uses it to abort
/// the failover loop — any adapter failure just advances to the next adapter.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the vendor.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The vendor rate limited the request (HTTP 429 or an equivalent signal).
    /// The owning adapter is demoted in the failover order for a backoff window.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The vendor that rate limited the request
        provider: String,
    },

    /// The call to the vendor timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The vendor that timed out
        provider: String,
    },

    /// The vendor rejected our credentials.
    #[error("Authentication failed: {provider} - {message}")]
    AuthFailed {
        /// The vendor that rejected the request
        provider: String,
        /// Detail from the vendor, if any
        message: String,
    },

    /// The vendor responded but the payload could not be decoded.
    #[error("Parse failed: {provider} - {message}")]
    ParseFailed {
        /// The vendor whose response failed to parse
        provider: String,
        /// Description of the decode failure
        message: String,
    },

    /// A vendor-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The vendor that returned the error
        provider: String,
        /// The error message from the vendor
        message: String,
    },

    /// The adapter does not implement this operation.
    #[error("Operation '{operation}' not supported by provider: {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The adapter that does not support it
        provider: String,
    },

    /// A waiter sharing another caller's in-flight fetch gave up waiting.
    /// This is the one failure the service surfaces to callers; it signals
    /// that even shared-waiting exceeded the bound and should be retried.
    #[error("Deduplicated wait timed out after {seconds}s")]
    DedupTimeout {
        /// How long the waiter blocked before giving up
        seconds: u64,
    },

    /// The in-flight fetch this caller attached to was dropped before
    /// publishing a result. Converted into a data-unavailable outcome by
    /// the service, never surfaced to callers.
    #[error("In-flight request was abandoned before completion")]
    InFlightAbandoned,

    /// A network error occurred while communicating with a vendor.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use optionsight_market_data::errors::{ErrorKind, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.kind(), ErrorKind::RateLimit);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.kind(), ErrorKind::NotFound);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SymbolNotFound(_) => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AuthFailed { .. } => ErrorKind::Auth,
            Self::ParseFailed { .. } => ErrorKind::Parse,
            Self::ProviderError { .. } => ErrorKind::Provider,
            Self::NotSupported { .. } => ErrorKind::Unsupported,
            Self::DedupTimeout { .. } => ErrorKind::DedupTimeout,
            Self::InFlightAbandoned => ErrorKind::InFlightAbandoned,
            Self::Network(_) => ErrorKind::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_not_found_kind() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rate_limited_kind() {
        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn test_timeout_kind() {
        let error = MarketDataError::Timeout {
            provider: "ALPHA_VANTAGE".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_not_supported_kind() {
        let error = MarketDataError::NotSupported {
            operation: "options_chain".to_string(),
            provider: "FINNHUB".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_dedup_timeout_kind() {
        let error = MarketDataError::DedupTimeout { seconds: 30 };
        assert_eq!(error.kind(), ErrorKind::DedupTimeout);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: YAHOO");

        let error = MarketDataError::ProviderError {
            provider: "EASTMONEY".to_string(),
            message: "unexpected payload".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: EASTMONEY - unexpected payload"
        );
    }
}
