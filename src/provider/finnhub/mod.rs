//! Finnhub vendor adapter.
//!
//! US-market data from the Finnhub API:
//! - Quotes via /quote
//! - Company profiles via /stock/profile2
//! - Earnings via /stock/earnings
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use num_traits::FromPrimitive;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{CompanyInfo, DataType, EarningsEntry, FetchRequest, Market, Quote};
use crate::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

const DEFAULT_CONFIG: AdapterConfig = AdapterConfig {
    name: PROVIDER_ID,
    priority: 30,
    enabled: true,
    data_types: &[DataType::Quote, DataType::Info, DataType::Earnings],
    markets: &[Market::Us],
};

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // Note: d (change) and dp (percent change) exist but are not used
}

/// Response from /stock/profile2 endpoint
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    name: Option<String>,
    exchange: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    #[serde(rename = "finnhubIndustry")]
    finnhub_industry: Option<String>,
}

/// One entry from /stock/earnings
#[derive(Debug, Deserialize)]
struct EarningsItem {
    actual: Option<f64>,
    estimate: Option<f64>,
    /// Fiscal period end, "YYYY-MM-DD"
    period: Option<String>,
    #[serde(rename = "surprisePercent")]
    surprise_percent: Option<f64>,
}

// ============================================================================
// Finnhub Adapter
// ============================================================================

/// Finnhub vendor adapter for the US market.
pub struct FinnhubAdapter {
    client: Client,
    api_key: String,
    config: AdapterConfig,
    runtime: AdapterRuntime,
}

impl FinnhubAdapter {
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
        path: &str,
        symbol: &str,
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", BASE_URL, path);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", &self.api_key)])
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!("Finnhub rate limited request for {}", symbol);
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(MarketDataError::AuthFailed {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("HTTP {}", response.status()),
                });
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketDataError::ParseFailed {
                provider: PROVIDER_ID.to_string(),
                message: format!("{} decode failed: {}", path, e),
            })
    }
}

#[async_trait]
impl VendorAdapter for FinnhubAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn runtime(&self) -> &AdapterRuntime {
        &self.runtime
    }

    async fn quote(&self, request: &FetchRequest) -> Result<Quote, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: QuoteResponse = self.get_json("/quote", symbol).await?;

        // Finnhub reports c=0 for unknown symbols rather than an error.
        let close = response
            .c
            .filter(|price| *price > 0.0)
            .and_then(Decimal::from_f64)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let timestamp = response
            .t
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        debug!("Finnhub quote for {}: {}", symbol, close);

        Ok(Quote {
            timestamp,
            open: response.o.and_then(Decimal::from_f64),
            high: response.h.and_then(Decimal::from_f64),
            low: response.l.and_then(Decimal::from_f64),
            close,
            previous_close: response.pc.and_then(Decimal::from_f64),
            volume: None,
            currency: "USD".to_string(),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn company_info(&self, request: &FetchRequest) -> Result<CompanyInfo, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let response: ProfileResponse = self.get_json("/stock/profile2", symbol).await?;

        // An empty object means the symbol is unknown.
        if response.name.is_none() && response.exchange.is_none() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        Ok(CompanyInfo {
            symbol: symbol.to_string(),
            name: response.name,
            exchange: response.exchange,
            sector: None,
            industry: response.finnhub_industry,
            country: response.country,
            currency: response.currency,
            description: None,
        })
    }

    async fn earnings(&self, request: &FetchRequest) -> Result<Vec<EarningsEntry>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let items: Vec<EarningsItem> = self.get_json("/stock/earnings", symbol).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let fiscal_date = item
                    .period
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;
                Some(EarningsEntry {
                    fiscal_date,
                    reported_eps: item.actual.and_then(Decimal::from_f64),
                    estimated_eps: item.estimate.and_then(Decimal::from_f64),
                    surprise_pct: item.surprise_percent,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_response_decodes() {
        let json = r#"{"c": 211.3, "h": 212.0, "l": 208.55, "o": 210.1, "pc": 209.8, "t": 1754380800}"#;
        let parsed: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.c, Some(211.3));
        assert_eq!(parsed.pc, Some(209.8));
    }

    #[test]
    fn test_unknown_symbol_quote_is_zero() {
        let json = r#"{"c": 0, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;
        let parsed: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.c.filter(|p| *p > 0.0), None);
    }

    #[test]
    fn test_earnings_item_decodes() {
        let json = r#"[{"actual": 1.4, "estimate": 1.35, "period": "2026-06-30", "surprisePercent": 3.7}]"#;
        let parsed: Vec<EarningsItem> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].period.as_deref(), Some("2026-06-30"));
    }

    #[test]
    fn test_default_config() {
        assert!(DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Us));
        assert!(DEFAULT_CONFIG.can_serve(DataType::Earnings, Market::Us));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::History, Market::Us));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Hk));
    }
}
