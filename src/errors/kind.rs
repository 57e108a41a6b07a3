//! Failure classification for metrics and adapter health bookkeeping.

use serde::{Deserialize, Serialize};

/// Classification of a fetch failure.
///
/// Stored on metrics records and used by adapter runtime state to decide
/// whether an error should flag the adapter as rate-limited. The two
/// aggregate kinds, [`AllProvidersFailed`](Self::AllProvidersFailed) and
/// [`InFlightAbandoned`](Self::InFlightAbandoned), are produced by the
/// service itself rather than by any single adapter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Symbol unknown to the vendor.
    NotFound,
    /// Vendor rate limit hit.
    RateLimit,
    /// Vendor call timed out.
    Timeout,
    /// Credentials rejected.
    Auth,
    /// Response decode failure.
    Parse,
    /// Other vendor-reported error.
    Provider,
    /// Operation not implemented by the adapter.
    Unsupported,
    /// Transport-level failure.
    Network,
    /// Every candidate adapter failed for this request.
    AllProvidersFailed,
    /// Shared-wait deadline exceeded.
    DedupTimeout,
    /// The in-flight fetch was dropped before completion.
    InFlightAbandoned,
}

impl ErrorKind {
    /// Stable snake_case label, used in metrics filters and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Parse => "parse",
            Self::Provider => "provider",
            Self::Unsupported => "unsupported",
            Self::Network => "network",
            Self::AllProvidersFailed => "all_providers_failed",
            Self::DedupTimeout => "dedup_timeout",
            Self::InFlightAbandoned => "in_flight_abandoned",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_snake_case() {
        assert_eq!(ErrorKind::RateLimit.as_str(), "rate_limit");
        assert_eq!(
            ErrorKind::AllProvidersFailed.as_str(),
            "all_providers_failed"
        );
        assert_eq!(ErrorKind::DedupTimeout.to_string(), "dedup_timeout");
    }
}
