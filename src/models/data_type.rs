use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kinds of market data the service can fetch.
///
/// Each kind carries a default cache TTL reflecting how quickly the
/// underlying data goes stale: quotes in seconds, history and option
/// chains in minutes, fundamentals-style data in hours. The service
/// applies these at cache-write time (overridable per service config);
/// the cache itself is TTL-policy-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Latest traded price snapshot.
    Quote,
    /// Daily OHLCV bars.
    History,
    /// Valuation and financial ratios.
    Fundamentals,
    /// Company profile (name, sector, exchange, ...).
    Info,
    /// Option chain for one expiration.
    OptionsChain,
    /// Available option expiration dates.
    OptionsExpirations,
    /// Historical earnings reports.
    Earnings,
    /// Margin trading terms for the symbol.
    MarginRate,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: &'static [DataType] = &[
        DataType::Quote,
        DataType::History,
        DataType::Fundamentals,
        DataType::Info,
        DataType::OptionsChain,
        DataType::OptionsExpirations,
        DataType::Earnings,
        DataType::MarginRate,
    ];

    /// Default cache TTL for this data type.
    pub fn default_ttl(&self) -> Duration {
        match self {
            Self::Quote => Duration::from_secs(10),
            Self::History => Duration::from_secs(5 * 60),
            Self::OptionsChain => Duration::from_secs(3 * 60),
            Self::OptionsExpirations => Duration::from_secs(6 * 60 * 60),
            Self::Fundamentals => Duration::from_secs(12 * 60 * 60),
            Self::Info => Duration::from_secs(24 * 60 * 60),
            Self::Earnings => Duration::from_secs(12 * 60 * 60),
            Self::MarginRate => Duration::from_secs(60 * 60),
        }
    }

    /// Stable snake_case label, used in cache keys, metrics, and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::History => "history",
            Self::Fundamentals => "fundamentals",
            Self::Info => "info",
            Self::OptionsChain => "options_chain",
            Self::OptionsExpirations => "options_expirations",
            Self::Earnings => "earnings",
            Self::MarginRate => "margin_rate",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ttl_is_seconds() {
        assert!(DataType::Quote.default_ttl() <= Duration::from_secs(60));
    }

    #[test]
    fn test_history_and_chain_ttl_is_minutes() {
        for dt in [DataType::History, DataType::OptionsChain] {
            let ttl = dt.default_ttl();
            assert!(ttl > Duration::from_secs(60));
            assert!(ttl < Duration::from_secs(60 * 60));
        }
    }

    #[test]
    fn test_slow_data_ttl_is_hours() {
        for dt in [
            DataType::Fundamentals,
            DataType::Info,
            DataType::OptionsExpirations,
            DataType::Earnings,
            DataType::MarginRate,
        ] {
            assert!(dt.default_ttl() >= Duration::from_secs(60 * 60));
        }
    }

    #[test]
    fn test_labels_unique() {
        let mut labels: Vec<_> = DataType::ALL.iter().map(|d| d.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), DataType::ALL.len());
    }
}
