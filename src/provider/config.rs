//! Static per-adapter configuration.

use crate::models::{DataType, Market};

/// Static configuration of one vendor adapter.
///
/// Fixed at registration time; the service reads it on every request to
/// filter and order candidate adapters but never mutates it. Lower
/// `priority` values are tried first.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Unique adapter name ("YAHOO", "EASTMONEY", ...)
    pub name: &'static str,

    /// Base failover priority; lower is tried first
    pub priority: u32,

    /// Disabled adapters are never selected
    pub enabled: bool,

    /// Data types this adapter can serve
    pub data_types: &'static [DataType],

    /// Markets this adapter covers
    pub markets: &'static [Market],
}

impl AdapterConfig {
    /// Whether this adapter is a candidate for `(data_type, market)`.
    pub fn can_serve(&self, data_type: DataType, market: Market) -> bool {
        self.enabled && self.data_types.contains(&data_type) && self.markets.contains(&market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: AdapterConfig = AdapterConfig {
        name: "TEST",
        priority: 10,
        enabled: true,
        data_types: &[DataType::Quote, DataType::History],
        markets: &[Market::Us, Market::Hk],
    };

    #[test]
    fn test_can_serve_matches_both_dimensions() {
        assert!(CONFIG.can_serve(DataType::Quote, Market::Us));
        assert!(CONFIG.can_serve(DataType::History, Market::Hk));
        assert!(!CONFIG.can_serve(DataType::OptionsChain, Market::Us));
        assert!(!CONFIG.can_serve(DataType::Quote, Market::Cn));
    }

    #[test]
    fn test_disabled_serves_nothing() {
        let disabled = AdapterConfig {
            enabled: false,
            ..CONFIG
        };
        assert!(!disabled.can_serve(DataType::Quote, Market::Us));
    }
}
