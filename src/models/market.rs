use serde::{Deserialize, Serialize};

/// Trading jurisdiction a symbol belongs to.
///
/// Derived deterministically from the symbol spelling by the resolver;
/// never persisted as mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// United States exchanges (NYSE, Nasdaq, ...).
    Us,
    /// Hong Kong Stock Exchange.
    Hk,
    /// Mainland China (Shanghai and Shenzhen).
    Cn,
}

impl Market {
    /// Uppercase market code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Hk => "HK",
            Self::Cn => "CN",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_codes() {
        assert_eq!(Market::Us.as_str(), "US");
        assert_eq!(Market::Hk.as_str(), "HK");
        assert_eq!(Market::Cn.to_string(), "CN");
    }
}
