//! EastMoney vendor adapter.
//!
//! Covers mainland China and Hong Kong through EastMoney's public JSON
//! endpoints: `push2` for real-time quotes, `push2his` for daily k-lines,
//! and the datacenter margin-trading dataset for per-symbol margin
//! financing detail. EastMoney identifies instruments by a `secid` of
//! the form `{exchange}.{code}`: `1` Shanghai, `0` Shenzhen, `116`
//! Hong Kong.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{Candle, DataType, FetchRequest, MarginRate, Market, Quote};
use crate::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};

const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const MARGIN_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";
const PROVIDER_ID: &str = "EASTMONEY";

const DEFAULT_CONFIG: AdapterConfig = AdapterConfig {
    name: PROVIDER_ID,
    priority: 15,
    enabled: true,
    data_types: &[DataType::Quote, DataType::History, DataType::MarginRate],
    markets: &[Market::Cn, Market::Hk],
};

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the push2 quote endpoint.
///
/// Numeric fields arrive as numbers normally but as the string "-" for
/// halted instruments, so they are decoded loosely and narrowed with
/// [`num`].
#[derive(Debug, Deserialize)]
struct EmQuoteResponse {
    data: Option<EmQuoteData>,
}

#[derive(Debug, Deserialize)]
struct EmQuoteData {
    /// Latest price
    f43: Option<Value>,
    /// Day high
    f44: Option<Value>,
    /// Day low
    f45: Option<Value>,
    /// Day open
    f46: Option<Value>,
    /// Cumulative volume (lots)
    f47: Option<Value>,
    /// Previous close
    f60: Option<Value>,
    /// Quote unix timestamp
    f86: Option<Value>,
}

/// Response from the push2his k-line endpoint.
#[derive(Debug, Deserialize)]
struct EmKlineResponse {
    data: Option<EmKlineData>,
}

#[derive(Debug, Deserialize)]
struct EmKlineData {
    /// Bars as "date,open,close,high,low,volume" strings
    #[serde(default)]
    klines: Vec<String>,
}

/// Response from the datacenter margin-trading dataset.
#[derive(Debug, Deserialize)]
struct EmMarginResponse {
    result: Option<EmMarginResult>,
}

#[derive(Debug, Deserialize)]
struct EmMarginResult {
    #[serde(default)]
    data: Vec<EmMarginRecord>,
}

#[derive(Debug, Deserialize)]
struct EmMarginRecord {
    /// Margin financing balance
    #[serde(rename = "RZYE")]
    financing_balance: Option<f64>,
    /// Trade date of the record
    #[serde(rename = "DIM_DATE")]
    dim_date: Option<String>,
}

// ============================================================================
// EastMoney Adapter
// ============================================================================

/// EastMoney vendor adapter for CN/HK markets.
pub struct EastMoneyAdapter {
    client: Client,
    config: AdapterConfig,
    runtime: AdapterRuntime,
}

impl EastMoneyAdapter {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CONFIG)
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            runtime: AdapterRuntime::new(),
        }
    }

    /// Build the EastMoney secid for a normalized symbol.
    fn secid(symbol: &str, market: Market) -> Result<String, MarketDataError> {
        let unsupported = || MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Cannot derive secid for symbol: {}", symbol),
        };

        match market {
            Market::Cn => {
                if let Some(code) = symbol.strip_suffix(".SS") {
                    Ok(format!("1.{}", code))
                } else if let Some(code) = symbol.strip_suffix(".SZ") {
                    Ok(format!("0.{}", code))
                } else {
                    Err(unsupported())
                }
            }
            Market::Hk => symbol
                .strip_suffix(".HK")
                .map(|code| format!("116.{}", code))
                .ok_or_else(unsupported),
            Market::Us => Err(unsupported()),
        }
    }

    /// Bare exchange code without the market suffix.
    fn bare_code(symbol: &str) -> &str {
        symbol.split('.').next().unwrap_or(symbol)
    }

    fn currency(market: Market) -> String {
        match market {
            Market::Hk => "HKD",
            _ => "CNY",
        }
        .to_string()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        let response = self.client.get(url).query(query).send().await?;

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
                message: format!("Response decode failed: {}", e),
            })
    }

    /// Parse one "date,open,close,high,low,volume" k-line string.
    fn parse_kline(line: &str) -> Option<Candle> {
        let mut parts = line.split(',');
        let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
        let open = Decimal::from_str(parts.next()?).ok()?;
        let close = Decimal::from_str(parts.next()?).ok()?;
        let high = Decimal::from_str(parts.next()?).ok()?;
        let low = Decimal::from_str(parts.next()?).ok()?;
        let volume = Decimal::from_str(parts.next()?).ok()?;

        Some(Candle {
            timestamp: date.and_time(NaiveTime::MIN).and_utc(),
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

impl Default for EastMoneyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorAdapter for EastMoneyAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn runtime(&self) -> &AdapterRuntime {
        &self.runtime
    }

    async fn quote(&self, request: &FetchRequest) -> Result<Quote, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let secid = Self::secid(symbol, request.market)?;

        let response: EmQuoteResponse = self
            .get_json(
                QUOTE_URL,
                &[
                    ("secid", secid),
                    ("invt", "2".to_string()),
                    // fltt=2 returns prices as plain decimals
                    ("fltt", "2".to_string()),
                    ("fields", "f43,f44,f45,f46,f47,f60,f86".to_string()),
                ],
            )
            .await?;

        let data = response
            .data
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let close = num(&data.f43)
            .and_then(Decimal::from_f64_retain)
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("No current price for {}", symbol),
            })?;

        let timestamp = num(&data.f86)
            .and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            timestamp,
            open: num(&data.f46).and_then(Decimal::from_f64_retain),
            high: num(&data.f44).and_then(Decimal::from_f64_retain),
            low: num(&data.f45).and_then(Decimal::from_f64_retain),
            close,
            previous_close: num(&data.f60).and_then(Decimal::from_f64_retain),
            volume: num(&data.f47).and_then(Decimal::from_f64_retain),
            currency: Self::currency(request.market),
            source: PROVIDER_ID.to_string(),
        })
    }

    async fn history(&self, request: &FetchRequest) -> Result<Vec<Candle>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let secid = Self::secid(symbol, request.market)?;
        let days = request.params.days.unwrap_or(365);

        let response: EmKlineResponse = self
            .get_json(
                KLINE_URL,
                &[
                    ("secid", secid),
                    // klt=101 daily bars, fqt=1 forward-adjusted
                    ("klt", "101".to_string()),
                    ("fqt", "1".to_string()),
                    ("lmt", days.to_string()),
                    ("end", "20500101".to_string()),
                    ("fields1", "f1,f2,f3".to_string()),
                    ("fields2", "f51,f52,f53,f54,f55,f56".to_string()),
                ],
            )
            .await?;

        let data = response
            .data
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let bars: Vec<Candle> = data
            .klines
            .iter()
            .filter_map(|line| Self::parse_kline(line))
            .collect();

        if bars.len() < data.klines.len() {
            warn!(
                "Dropped {} malformed k-lines for {}",
                data.klines.len() - bars.len(),
                symbol
            );
        }
        debug!("Fetched {} history bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    async fn margin_rate(&self, request: &FetchRequest) -> Result<MarginRate, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let code = Self::bare_code(symbol);

        let response: EmMarginResponse = self
            .get_json(
                MARGIN_URL,
                &[
                    ("reportName", "RPTA_WEB_RZRQ_GGMX".to_string()),
                    ("columns", "ALL".to_string()),
                    ("filter", format!("(scode=\"{}\")", code)),
                    ("sortColumns", "dim_date".to_string()),
                    ("sortTypes", "-1".to_string()),
                    ("pageSize", "1".to_string()),
                ],
            )
            .await?;

        let record = response.result.and_then(|r| r.data.into_iter().next());

        // Absence from the margin-trading list is an answer, not a failure:
        // the symbol is simply not marginable.
        let Some(record) = record else {
            return Ok(MarginRate {
                marginable: false,
                initial_margin: None,
                financing_rate: None,
                financing_balance: None,
                currency: Self::currency(request.market),
                as_of: Utc::now(),
            });
        };

        let as_of = record
            .dim_date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(&s[..10.min(s.len())], "%Y-%m-%d").ok())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(Utc::now);

        Ok(MarginRate {
            marginable: true,
            initial_margin: None,
            financing_rate: None,
            financing_balance: record.financing_balance.and_then(Decimal::from_f64_retain),
            currency: Self::currency(request.market),
            as_of,
        })
    }
}

/// Narrow a loosely-typed push2 field to a number, treating the "-"
/// placeholder (and anything else non-numeric) as absent.
fn num(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secid_mapping() {
        assert_eq!(
            EastMoneyAdapter::secid("600519.SS", Market::Cn).unwrap(),
            "1.600519"
        );
        assert_eq!(
            EastMoneyAdapter::secid("000001.SZ", Market::Cn).unwrap(),
            "0.000001"
        );
        assert_eq!(
            EastMoneyAdapter::secid("0700.HK", Market::Hk).unwrap(),
            "116.0700"
        );
        assert!(EastMoneyAdapter::secid("AAPL", Market::Us).is_err());
    }

    #[test]
    fn test_parse_kline() {
        let bar = EastMoneyAdapter::parse_kline("2026-08-05,1700.00,1712.50,1720.00,1695.10,32000")
            .unwrap();
        assert_eq!(bar.open.to_string(), "1700.00");
        assert_eq!(bar.close.to_string(), "1712.50");
        assert_eq!(bar.high.to_string(), "1720.00");
        assert_eq!(bar.low.to_string(), "1695.10");
        assert_eq!(bar.volume.to_string(), "32000");
    }

    #[test]
    fn test_parse_kline_rejects_malformed() {
        assert!(EastMoneyAdapter::parse_kline("garbage").is_none());
        assert!(EastMoneyAdapter::parse_kline("2026-08-05,1,2").is_none());
        assert!(EastMoneyAdapter::parse_kline("2026-08-05,1,2,3,4,-").is_none());
    }

    #[test]
    fn test_num_narrows_placeholder() {
        assert_eq!(num(&Some(Value::from(12.5))), Some(12.5));
        assert_eq!(num(&Some(Value::from("-"))), None);
        assert_eq!(num(&None), None);
    }

    #[test]
    fn test_quote_response_decodes_with_halted_fields() {
        let json = r#"{"data": {"f43": "-", "f44": 10.5, "f45": 10.1, "f46": 10.2, "f47": 1000, "f60": 10.3, "f86": 1754380800}}"#;
        let parsed: EmQuoteResponse = serde_json::from_str(json).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(num(&data.f43), None);
        assert_eq!(num(&data.f44), Some(10.5));
    }

    #[test]
    fn test_unknown_symbol_has_null_data() {
        let parsed: EmQuoteResponse = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(parsed.data.is_none());
    }

    #[test]
    fn test_default_config() {
        assert!(DEFAULT_CONFIG.can_serve(DataType::MarginRate, Market::Cn));
        assert!(DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Hk));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Us));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::OptionsChain, Market::Cn));
    }
}
