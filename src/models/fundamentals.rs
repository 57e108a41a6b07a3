use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Valuation and financial ratios for a symbol.
///
/// Every field is optional — vendors differ widely in coverage, and the
/// scoring layer downstream treats a missing ratio as "not scorable"
/// rather than an error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<Decimal>,

    /// Dividend yield as a fraction (0.015 = 1.5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Company profile data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Normalized symbol this profile belongs to
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One reported earnings period.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EarningsEntry {
    /// End of the fiscal period
    pub fiscal_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_eps: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_eps: Option<Decimal>,

    /// Surprise versus estimate, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surprise_pct: Option<f64>,
}

/// Margin trading terms for a symbol.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarginRate {
    /// Whether the symbol is eligible for margin trading at all
    pub marginable: bool,

    /// Initial margin requirement as a fraction of position value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_margin: Option<Decimal>,

    /// Annualized financing rate for a margin position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing_rate: Option<Decimal>,

    /// Outstanding margin financing balance, when the venue publishes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing_balance: Option<Decimal>,

    pub currency: String,

    /// When the terms were observed
    pub as_of: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fundamentals_default_is_all_none() {
        let f = Fundamentals::default();
        assert!(f.market_cap.is_none());
        assert!(f.pe_ratio.is_none());
        assert!(f.currency.is_none());
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let info = CompanyInfo {
            symbol: "AAPL".to_string(),
            name: Some("Apple Inc.".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("Apple"));
        assert!(!json.contains("sector"));
    }
}
