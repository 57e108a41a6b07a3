//! Yahoo Finance API response models.
//!
//! These models parse the quoteSummary and options API responses,
//! which provide richer data than the chart endpoints the
//! `yahoo_finance_api` crate wraps.

use serde::Deserialize;

// ============================================================================
// quoteSummary
// ============================================================================

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

/// Quote summary container
#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    #[serde(default)]
    pub result: Vec<YahooQuoteSummaryResult>,
    // Note: error field exists in API but we handle errors via HTTP status/empty results
}

/// Individual result from quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResult {
    pub price: Option<YahooPriceData>,
    pub summary_profile: Option<YahooSummaryProfile>,
    pub summary_detail: Option<YahooSummaryDetail>,
    pub default_key_statistics: Option<YahooKeyStatistics>,
    pub earnings_history: Option<YahooEarningsHistory>,
}

/// Price data from quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooPriceData {
    pub currency: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub exchange_name: Option<String>,
}

/// Numeric detail with raw and formatted values
#[derive(Debug, Deserialize, Clone)]
pub struct YahooRawValue {
    pub raw: Option<f64>,
    // Note: fmt field exists but we only use raw values
}

/// Summary profile data (company info)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub long_business_summary: Option<String>,
}

/// Summary detail data (financial metrics)
/// Yahoo returns these as nested objects like {"raw": 123.45, "fmt": "123.45"}
/// or empty objects {} when no data is available.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryDetail {
    pub market_cap: Option<YahooRawValue>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<YahooRawValue>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<YahooRawValue>,
    pub dividend_yield: Option<YahooRawValue>,
    pub beta: Option<YahooRawValue>,
    pub fifty_two_week_high: Option<YahooRawValue>,
    pub fifty_two_week_low: Option<YahooRawValue>,
}

/// Key statistics (EPS lives here rather than in summaryDetail)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooKeyStatistics {
    pub trailing_eps: Option<YahooRawValue>,
}

/// Earnings history container
#[derive(Debug, Deserialize)]
pub struct YahooEarningsHistory {
    #[serde(default)]
    pub history: Vec<YahooEarningsPeriod>,
}

/// One reported earnings period
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooEarningsPeriod {
    pub eps_actual: Option<YahooRawValue>,
    pub eps_estimate: Option<YahooRawValue>,
    pub surprise_percent: Option<YahooRawValue>,
    /// Fiscal quarter end as a unix timestamp in `raw`
    pub quarter: Option<YahooRawValue>,
}

// ============================================================================
// options
// ============================================================================

/// Main response wrapper for the options API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionsResponse {
    pub option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
pub struct YahooOptionChain {
    #[serde(default)]
    pub result: Vec<YahooOptionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionResult {
    pub underlying_symbol: Option<String>,
    /// Unix timestamps of all listed expirations
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    /// Chain data for the requested (or nearest) expiration
    #[serde(default)]
    pub options: Vec<YahooOptionSlice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionSlice {
    pub expiration_date: Option<i64>,
    #[serde(default)]
    pub calls: Vec<YahooOptionContract>,
    #[serde(default)]
    pub puts: Vec<YahooOptionContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooOptionContract {
    pub contract_symbol: String,
    pub strike: f64,
    pub last_price: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub implied_volatility: Option<f64>,
    pub in_the_money: Option<bool>,
}
