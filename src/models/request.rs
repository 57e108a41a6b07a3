use std::sync::Arc;

use chrono::NaiveDate;

use super::{DataType, Market};

/// Extra parameters that disambiguate a fetch beyond (data type, symbol).
///
/// Only the fields relevant to the requested [`DataType`] are read by
/// adapters; all fields participate in cache-key equality so that, for
/// example, two different expiry dates of the same chain cache separately.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FetchParams {
    /// Option chain expiration date (`OptionsChain`)
    pub expiry: Option<NaiveDate>,

    /// History window length in calendar days (`History`)
    pub days: Option<u32>,
}

impl FetchParams {
    /// Parameters for a history fetch over the trailing `days` window.
    pub fn history_days(days: u32) -> Self {
        Self {
            days: Some(days),
            ..Self::default()
        }
    }

    /// Parameters for an options-chain fetch at a specific expiry.
    pub fn chain_expiry(expiry: NaiveDate) -> Self {
        Self {
            expiry: Some(expiry),
            ..Self::default()
        }
    }
}

/// Cache and deduplication key for one logical request.
///
/// Two requests with equal keys are the same request: they hit the same
/// cache entry and share the same in-flight upstream call. The symbol is
/// always the normalized spelling, so "600519" and "600519.SS" collapse
/// to one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub data_type: DataType,
    pub symbol: Arc<str>,
    pub params: FetchParams,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.data_type, self.symbol)?;
        if let Some(expiry) = self.params.expiry {
            write!(f, ":{}", expiry)?;
        }
        if let Some(days) = self.params.days {
            write!(f, ":{}d", days)?;
        }
        Ok(())
    }
}

/// A fully resolved request handed to vendor adapters.
///
/// The service builds this once per logical request, after market
/// detection and symbol normalization; adapters treat it as read-only.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub data_type: DataType,
    /// Normalized symbol
    pub symbol: Arc<str>,
    pub market: Market,
    pub params: FetchParams,
}

impl FetchRequest {
    /// The cache/dedup key this request maps to.
    pub fn key(&self) -> CacheKey {
        CacheKey {
            data_type: self.data_type,
            symbol: self.symbol.clone(),
            params: self.params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_differ_by_params() {
        let a = CacheKey {
            data_type: DataType::OptionsChain,
            symbol: Arc::from("AAPL"),
            params: FetchParams::chain_expiry(NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()),
        };
        let b = CacheKey {
            data_type: DataType::OptionsChain,
            symbol: Arc::from("AAPL"),
            params: FetchParams::chain_expiry(NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn test_equal_keys_are_equal() {
        let a = CacheKey {
            data_type: DataType::Quote,
            symbol: Arc::from("0700.HK"),
            params: FetchParams::default(),
        };
        let b = CacheKey {
            data_type: DataType::Quote,
            symbol: Arc::from("0700.HK"),
            params: FetchParams::default(),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_display() {
        let key = CacheKey {
            data_type: DataType::History,
            symbol: Arc::from("AAPL"),
            params: FetchParams::history_days(90),
        };
        assert_eq!(key.to_string(), "history:AAPL:90d");
    }
}
