//! Alpha Vantage vendor adapter.
//!
//! US-market data from the Alpha Vantage API:
//! - Quotes via GLOBAL_QUOTE
//! - Daily history via TIME_SERIES_DAILY
//! - Fundamentals and company info via OVERVIEW
//! - Earnings via EARNINGS
//!
//! Note: Alpha Vantage free tier is limited to 25 API calls per day;
//! the "Note"/"Information" response fields signal rate limiting.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{
    Candle, CompanyInfo, DataType, EarningsEntry, FetchRequest, Fundamentals, Market, Quote,
};
use crate::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

const DEFAULT_CONFIG: AdapterConfig = AdapterConfig {
    name: PROVIDER_ID,
    priority: 20,
    enabled: true,
    data_types: &[
        DataType::Quote,
        DataType::History,
        DataType::Fundamentals,
        DataType::Info,
        DataType::Earnings,
    ],
    markets: &[Market::Us],
};

// ============================================================================
// API Response Structures
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

/// TIME_SERIES_DAILY response
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// OVERVIEW response
/// Only includes fields mapped to our models; the API returns many more.
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "ForwardPE")]
    forward_pe: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(rename = "Beta")]
    beta: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// EARNINGS response
#[derive(Debug, Deserialize)]
struct EarningsResponse {
    #[serde(rename = "quarterlyEarnings")]
    quarterly_earnings: Option<Vec<QuarterlyEarnings>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuarterlyEarnings {
    #[serde(rename = "fiscalDateEnding")]
    fiscal_date_ending: Option<String>,
    #[serde(rename = "reportedEPS")]
    reported_eps: Option<String>,
    #[serde(rename = "estimatedEPS")]
    estimated_eps: Option<String>,
    #[serde(rename = "surprisePercentage")]
    surprise_percentage: Option<String>,
}

// ============================================================================
// Alpha Vantage Adapter
// ============================================================================

/// Alpha Vantage vendor adapter for the US market.
pub struct AlphaVantageAdapter {
    client: Client,
    api_key: String,
    config: AdapterConfig,
    runtime: AdapterRuntime,
}

impl AlphaVantageAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(api_key, DEFAULT_CONFIG)
    }

    pub fn with_config(api_key: impl Into<String>, config: AdapterConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            config,
            runtime: AdapterRuntime::new(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        function: &str,
        symbol: &str,
    ) -> Result<T, MarketDataError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketDataError::ParseFailed {
                provider: PROVIDER_ID.to_string(),
                message: format!("{} decode failed: {}", function, e),
            })
    }

    /// Check the API-level error fields every Alpha Vantage payload can carry.
    ///
    /// A "Note" or "Information" field usually indicates rate limiting on
    /// the free tier; an "Error Message" indicates a bad symbol or call.
    fn check_api_errors(
        symbol: &str,
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = error_message {
            debug!("Alpha Vantage error for {}: {}", symbol, msg);
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
        if note.is_some() || information.is_some() {
            warn!("Alpha Vantage rate limit signal for {}", symbol);
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VendorAdapter for AlphaVantageAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn runtime(&self) -> &AdapterRuntime {
        &self.runtime
    }

    async fn quote(&self, request: &FetchRequest) -> Result<Quote, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: GlobalQuoteResponse = self.get_json("GLOBAL_QUOTE", symbol).await?;
        Self::check_api_errors(
            symbol,
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quote = response
            .global_quote
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let close = parse_decimal(&quote.price).ok_or_else(|| MarketDataError::ParseFailed {
            provider: PROVIDER_ID.to_string(),
            message: format!("No price in GLOBAL_QUOTE for {}", symbol),
        })?;

        let timestamp = quote
            .latest_trading_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            timestamp,
            open: parse_decimal(&quote.open),
            high: parse_decimal(&quote.high),
            low: parse_decimal(&quote.low),
            close,
            previous_close: parse_decimal(&quote.previous_close),
            volume: parse_decimal(&quote.volume),
            currency: "USD".to_string(),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn history(&self, request: &FetchRequest) -> Result<Vec<Candle>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: TimeSeriesResponse = self.get_json("TIME_SERIES_DAILY", symbol).await?;
        Self::check_api_errors(
            symbol,
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let series = response
            .time_series
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let days = request.params.days.unwrap_or(365);
        let cutoff = Utc::now().date_naive() - chrono::Duration::days(i64::from(days));

        let mut bars: Vec<Candle> = series
            .iter()
            .filter_map(|(date, bar)| {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                if date < cutoff {
                    return None;
                }
                Some(Candle {
                    timestamp: date.and_time(NaiveTime::MIN).and_utc(),
                    open: Decimal::from_str(&bar.open).ok()?,
                    high: Decimal::from_str(&bar.high).ok()?,
                    low: Decimal::from_str(&bar.low).ok()?,
                    close: Decimal::from_str(&bar.close).ok()?,
                    volume: Decimal::from_str(&bar.volume).ok()?,
                })
            })
            .collect();

        bars.sort_by_key(|bar| bar.timestamp);
        debug!("Fetched {} history bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    async fn fundamentals(&self, request: &FetchRequest) -> Result<Fundamentals, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: OverviewResponse = self.get_json("OVERVIEW", symbol).await?;
        Self::check_api_errors(
            symbol,
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        if response.symbol.is_none() {
            // OVERVIEW returns an empty object for unknown symbols.
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        Ok(Fundamentals {
            market_cap: parse_decimal(&response.market_capitalization),
            pe_ratio: parse_f64(&response.pe_ratio),
            forward_pe: parse_f64(&response.forward_pe),
            eps: parse_decimal(&response.eps),
            dividend_yield: parse_f64(&response.dividend_yield),
            beta: parse_f64(&response.beta),
            fifty_two_week_high: parse_decimal(&response.week_52_high),
            fifty_two_week_low: parse_decimal(&response.week_52_low),
            currency: response.currency,
        })
    }

    async fn company_info(&self, request: &FetchRequest) -> Result<CompanyInfo, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: OverviewResponse = self.get_json("OVERVIEW", symbol).await?;
        Self::check_api_errors(
            symbol,
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        if response.symbol.is_none() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        Ok(CompanyInfo {
            symbol: symbol.to_string(),
            name: response.name,
            exchange: response.exchange,
            sector: response.sector,
            industry: response.industry,
            country: response.country,
            currency: response.currency,
            description: response.description,
        })
    }

    async fn earnings(&self, request: &FetchRequest) -> Result<Vec<EarningsEntry>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: EarningsResponse = self.get_json("EARNINGS", symbol).await?;
        Self::check_api_errors(
            symbol,
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quarters = response
            .quarterly_earnings
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(quarters
            .into_iter()
            .filter_map(|q| {
                let fiscal_date = q
                    .fiscal_date_ending
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;
                Some(EarningsEntry {
                    fiscal_date,
                    reported_eps: parse_decimal(&q.reported_eps),
                    estimated_eps: parse_decimal(&q.estimated_eps),
                    surprise_pct: parse_f64(&q.surprise_percentage),
                })
            })
            .collect())
    }
}

/// Parse a numeric string field, treating "None"/"-" placeholders as absent.
fn parse_decimal(value: &Option<String>) -> Option<Decimal> {
    value.as_deref().and_then(|s| Decimal::from_str(s).ok())
}

fn parse_f64(value: &Option<String>) -> Option<f64> {
    value.as_deref().and_then(|s| f64::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_quote_decodes() {
        let json = r#"{
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "210.10",
                "03. high": "212.00",
                "04. low": "208.55",
                "05. price": "211.30",
                "06. volume": "51234567",
                "07. latest trading day": "2026-08-05",
                "08. previous close": "209.80"
            }
        }"#;
        let parsed: GlobalQuoteResponse = serde_json::from_str(json).unwrap();
        let quote = parsed.global_quote.unwrap();
        assert_eq!(quote.price.as_deref(), Some("211.30"));
        assert_eq!(quote.latest_trading_day.as_deref(), Some("2026-08-05"));
    }

    #[test]
    fn test_note_field_is_rate_limit() {
        let err = AlphaVantageAdapter::check_api_errors(
            "AAPL",
            &None,
            &Some("Thank you for using Alpha Vantage!".to_string()),
            &None,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_error_message_is_symbol_not_found() {
        let err = AlphaVantageAdapter::check_api_errors(
            "NOPE",
            &Some("Invalid API call.".to_string()),
            &None,
            &None,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_clean_response_passes() {
        assert!(AlphaVantageAdapter::check_api_errors("AAPL", &None, &None, &None).is_ok());
    }

    #[test]
    fn test_parse_decimal_placeholders() {
        assert_eq!(parse_decimal(&Some("None".to_string())), None);
        assert_eq!(parse_decimal(&Some("-".to_string())), None);
        assert_eq!(
            parse_decimal(&Some("12.34".to_string())),
            Some(Decimal::from_str("12.34").unwrap())
        );
        assert_eq!(parse_decimal(&None), None);
    }

    #[test]
    fn test_default_config_is_us_only() {
        assert!(DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Us));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Cn));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::OptionsChain, Market::Us));
    }
}
