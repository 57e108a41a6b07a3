use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One listed option contract within a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC-style contract symbol (e.g. "AAPL260116C00200000")
    pub contract_symbol: String,

    /// Strike price
    pub strike: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<u64>,

    /// Vendor-reported implied volatility, as a fraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_volatility: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_the_money: Option<bool>,
}

/// Option chain for one underlying and one expiration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionChain {
    /// Underlying symbol, normalized
    pub underlying: String,

    /// Expiration date of every contract in this chain
    pub expiration: NaiveDate,

    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    /// Total number of contracts on both sides.
    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}
