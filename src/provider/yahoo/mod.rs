//! Yahoo Finance vendor adapter.
//!
//! Yahoo covers all three markets this platform serves: US tickers
//! natively, Hong Kong via the `.HK` suffix, mainland China via the
//! `.SS`/`.SZ` suffixes. Quotes and history go through the
//! `yahoo_finance_api` crate; company info, fundamentals, earnings, and
//! options use the quoteSummary/options endpoints directly, which
//! require Yahoo's crumb/cookie authentication.

mod models;

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use num_traits::FromPrimitive;
use reqwest::header;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{
    Candle, CompanyInfo, DataType, EarningsEntry, FetchRequest, Fundamentals, Market, OptionChain,
    OptionContract, Quote,
};
use crate::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};

use models::{
    YahooOptionResult, YahooOptionsResponse, YahooQuoteSummaryResponse, YahooQuoteSummaryResult,
};

const PROVIDER_ID: &str = "YAHOO";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const DEFAULT_CONFIG: AdapterConfig = AdapterConfig {
    name: PROVIDER_ID,
    priority: 10,
    enabled: true,
    data_types: &[
        DataType::Quote,
        DataType::History,
        DataType::Fundamentals,
        DataType::Info,
        DataType::OptionsChain,
        DataType::OptionsExpirations,
        DataType::Earnings,
    ],
    markets: &[Market::Us, Market::Hk, Market::Cn],
};

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

lazy_static! {
    /// Global cache for Yahoo authentication crumb
    static ref YAHOO_CRUMB: RwLock<Option<CrumbData>> = RwLock::default();
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance vendor adapter.
pub struct YahooAdapter {
    connector: yahoo::YahooConnector,
    client: reqwest::Client,
    config: AdapterConfig,
    runtime: AdapterRuntime,
}

impl YahooAdapter {
    /// Create a new Yahoo Finance adapter with the default config.
    pub fn new() -> Result<Self, MarketDataError> {
        Self::with_config(DEFAULT_CONFIG)
    }

    /// Create an adapter with custom priority/enablement.
    pub fn with_config(config: AdapterConfig) -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to initialize Yahoo connector: {}", e),
        })?;
        Ok(Self {
            connector,
            client: reqwest::Client::new(),
            config,
            runtime: AdapterRuntime::new(),
        })
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        {
            let guard = YAHOO_CRUMB.read().unwrap_or_else(|p| p.into_inner());
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }
        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: Get cookie from fc.yahoo.com
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get cookie: {}", e),
            })?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::AuthFailed {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let crumb = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get crumb: {}", e),
            })?
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read crumb: {}", e),
            })?;

        let crumb_data = CrumbData { cookie, crumb };

        let mut guard = YAHOO_CRUMB.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(crumb_data.clone());

        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails)
    fn clear_crumb(&self) {
        let mut guard = YAHOO_CRUMB.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    // ========================================================================
    // Shared fetch helpers
    // ========================================================================

    /// Fetch one quoteSummary result with the given modules.
    async fn quote_summary(
        &self,
        symbol: &str,
        modules: &str,
    ) -> Result<YahooQuoteSummaryResult, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            encode(symbol),
            modules,
            encode(&crumb.crumb)
        );

        let response = self
            .client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            return Err(MarketDataError::AuthFailed {
                provider: PROVIDER_ID.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let data: YahooQuoteSummaryResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::ParseFailed {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("quoteSummary decode failed: {}", e),
                })?;

        data.quote_summary
            .result
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
    }

    /// Fetch the options payload, optionally pinned to an expiration.
    async fn options_payload(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<YahooOptionResult, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let mut url = format!(
            "https://query1.finance.yahoo.com/v7/finance/options/{}?crumb={}",
            encode(symbol),
            encode(&crumb.crumb)
        );
        if let Some(date) = expiry {
            let epoch = date.and_time(NaiveTime::MIN).and_utc().timestamp();
            url.push_str(&format!("&date={}", epoch));
        }

        let response = self
            .client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            return Err(MarketDataError::AuthFailed {
                provider: PROVIDER_ID.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let data: YahooOptionsResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::ParseFailed {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("options decode failed: {}", e),
                })?;

        data.option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Convert a Yahoo chart quote to our Quote model.
    fn to_quote(&self, yahoo_quote: yahoo::Quote, currency: String) -> Result<Quote, MarketDataError> {
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(yahoo_quote.timestamp as i64, 0)
            .single()
            .ok_or_else(|| MarketDataError::ParseFailed {
                provider: PROVIDER_ID.to_string(),
                message: format!("Invalid timestamp: {}", yahoo_quote.timestamp),
            })?;

        let close = Decimal::from_f64_retain(yahoo_quote.close).ok_or_else(|| {
            MarketDataError::ParseFailed {
                provider: PROVIDER_ID.to_string(),
                message: format!("Invalid close price: {}", yahoo_quote.close),
            }
        })?;

        Ok(Quote {
            timestamp,
            open: Decimal::from_f64_retain(yahoo_quote.open),
            high: Decimal::from_f64_retain(yahoo_quote.high),
            low: Decimal::from_f64_retain(yahoo_quote.low),
            close,
            previous_close: None,
            volume: Decimal::from_u64(yahoo_quote.volume),
            currency,
            source: PROVIDER_ID.to_string(),
        })
    }

    /// Convert a Yahoo chart quote to a history bar.
    ///
    /// Bars with unconvertible prices are dropped rather than failing
    /// the whole window.
    fn to_candle(yahoo_quote: &yahoo::Quote) -> Option<Candle> {
        let timestamp = Utc.timestamp_opt(yahoo_quote.timestamp as i64, 0).single()?;
        Some(Candle {
            timestamp,
            open: Decimal::from_f64_retain(yahoo_quote.open)?,
            high: Decimal::from_f64_retain(yahoo_quote.high)?,
            low: Decimal::from_f64_retain(yahoo_quote.low)?,
            close: Decimal::from_f64_retain(yahoo_quote.close)?,
            volume: Decimal::from_u64(yahoo_quote.volume)?,
        })
    }

    fn to_contract(contract: models::YahooOptionContract) -> Option<OptionContract> {
        Some(OptionContract {
            strike: Decimal::from_f64_retain(contract.strike)?,
            contract_symbol: contract.contract_symbol,
            last_price: contract.last_price.and_then(Decimal::from_f64_retain),
            bid: contract.bid.and_then(Decimal::from_f64_retain),
            ask: contract.ask.and_then(Decimal::from_f64_retain),
            volume: contract.volume,
            open_interest: contract.open_interest,
            implied_volatility: contract.implied_volatility,
            in_the_money: contract.in_the_money,
        })
    }

    fn epoch_to_date(epoch: i64) -> Option<NaiveDate> {
        Utc.timestamp_opt(epoch, 0).single().map(|d| d.date_naive())
    }
}

#[async_trait]
impl VendorAdapter for YahooAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn runtime(&self) -> &AdapterRuntime {
        &self.runtime
    }

    async fn quote(&self, request: &FetchRequest) -> Result<Quote, MarketDataError> {
        let symbol = request.symbol.as_ref();

        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| map_yahoo_error(symbol, e))?;

        let yahoo_quote = response.last_quote().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;

        self.to_quote(yahoo_quote, market_currency(request.market))
    }

    async fn history(&self, request: &FetchRequest) -> Result<Vec<Candle>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let days = request.params.days.unwrap_or(365);

        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(days));

        let response = self
            .connector
            .get_quote_history(symbol, to_offset_datetime(start), to_offset_datetime(end))
            .await
            .map_err(|e| map_yahoo_error(symbol, e))?;

        let quotes = response.quotes().map_err(|e| {
            warn!("No history returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;

        let bars: Vec<Candle> = quotes.iter().filter_map(Self::to_candle).collect();
        debug!("Fetched {} history bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    async fn fundamentals(&self, request: &FetchRequest) -> Result<Fundamentals, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let result = self
            .quote_summary(symbol, "price,summaryDetail,defaultKeyStatistics")
            .await?;

        let detail = result.summary_detail.as_ref();
        let raw = |v: Option<&models::YahooRawValue>| v.and_then(|r| r.raw);

        Ok(Fundamentals {
            market_cap: raw(detail.and_then(|d| d.market_cap.as_ref()))
                .and_then(Decimal::from_f64_retain),
            pe_ratio: raw(detail.and_then(|d| d.trailing_pe.as_ref())),
            forward_pe: raw(detail.and_then(|d| d.forward_pe.as_ref())),
            eps: raw(result
                .default_key_statistics
                .as_ref()
                .and_then(|s| s.trailing_eps.as_ref()))
            .and_then(Decimal::from_f64_retain),
            dividend_yield: raw(detail.and_then(|d| d.dividend_yield.as_ref())),
            beta: raw(detail.and_then(|d| d.beta.as_ref())),
            fifty_two_week_high: raw(detail.and_then(|d| d.fifty_two_week_high.as_ref()))
                .and_then(Decimal::from_f64_retain),
            fifty_two_week_low: raw(detail.and_then(|d| d.fifty_two_week_low.as_ref()))
                .and_then(Decimal::from_f64_retain),
            currency: result.price.as_ref().and_then(|p| p.currency.clone()),
        })
    }

    async fn company_info(&self, request: &FetchRequest) -> Result<CompanyInfo, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let result = self.quote_summary(symbol, "price,summaryProfile").await?;

        let price = result.price.as_ref();
        let profile = result.summary_profile.as_ref();

        Ok(CompanyInfo {
            symbol: symbol.to_string(),
            name: price.and_then(|p| p.long_name.clone().or_else(|| p.short_name.clone())),
            exchange: price.and_then(|p| p.exchange_name.clone()),
            sector: profile.and_then(|p| p.sector.clone()),
            industry: profile.and_then(|p| p.industry.clone()),
            country: profile.and_then(|p| p.country.clone()),
            currency: price.and_then(|p| p.currency.clone()),
            description: profile.and_then(|p| p.long_business_summary.clone()),
        })
    }

    async fn options_chain(&self, request: &FetchRequest) -> Result<OptionChain, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let result = self.options_payload(symbol, request.params.expiry).await?;

        let slice = result
            .options
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("No option chain data for {}", symbol),
            })?;

        let expiration = slice
            .expiration_date
            .and_then(Self::epoch_to_date)
            .or(request.params.expiry)
            .ok_or_else(|| MarketDataError::ParseFailed {
                provider: PROVIDER_ID.to_string(),
                message: "Option chain missing expiration date".to_string(),
            })?;

        Ok(OptionChain {
            underlying: result
                .underlying_symbol
                .unwrap_or_else(|| symbol.to_string()),
            expiration,
            calls: slice.calls.into_iter().filter_map(Self::to_contract).collect(),
            puts: slice.puts.into_iter().filter_map(Self::to_contract).collect(),
        })
    }

    async fn options_expirations(
        &self,
        request: &FetchRequest,
    ) -> Result<Vec<NaiveDate>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let result = self.options_payload(symbol, None).await?;

        Ok(result
            .expiration_dates
            .into_iter()
            .filter_map(Self::epoch_to_date)
            .collect())
    }

    async fn earnings(&self, request: &FetchRequest) -> Result<Vec<EarningsEntry>, MarketDataError> {
        let symbol = request.symbol.as_ref();
        let result = self.quote_summary(symbol, "earningsHistory").await?;

        let history = result
            .earnings_history
            .map(|h| h.history)
            .unwrap_or_default();

        Ok(history
            .into_iter()
            .filter_map(|period| {
                let fiscal_date = period
                    .quarter
                    .as_ref()
                    .and_then(|q| q.raw)
                    .and_then(|epoch| Self::epoch_to_date(epoch as i64))?;
                Some(EarningsEntry {
                    fiscal_date,
                    reported_eps: period
                        .eps_actual
                        .as_ref()
                        .and_then(|v| v.raw)
                        .and_then(Decimal::from_f64_retain),
                    estimated_eps: period
                        .eps_estimate
                        .as_ref()
                        .and_then(|v| v.raw)
                        .and_then(Decimal::from_f64_retain),
                    surprise_pct: period.surprise_percent.as_ref().and_then(|v| v.raw),
                })
            })
            .collect())
    }
}

/// Map library errors, distinguishing "symbol unknown" from transport noise.
fn map_yahoo_error(symbol: &str, e: yahoo::YahooError) -> MarketDataError {
    if matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
        MarketDataError::SymbolNotFound(symbol.to_string())
    } else {
        MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        }
    }
}

/// Convert chrono DateTime<Utc> to time::OffsetDateTime for the Yahoo API.
fn to_offset_datetime(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Trading currency per market; quoteSummary overrides this when present.
fn market_currency(market: Market) -> String {
    match market {
        Market::Us => "USD",
        Market::Hk => "HKD",
        Market::Cn => "CNY",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_covers_all_markets() {
        assert_eq!(DEFAULT_CONFIG.name, "YAHOO");
        assert!(DEFAULT_CONFIG.can_serve(DataType::Quote, Market::Cn));
        assert!(DEFAULT_CONFIG.can_serve(DataType::OptionsChain, Market::Us));
        assert!(!DEFAULT_CONFIG.can_serve(DataType::MarginRate, Market::Us));
    }

    #[test]
    fn test_market_currency() {
        assert_eq!(market_currency(Market::Us), "USD");
        assert_eq!(market_currency(Market::Hk), "HKD");
        assert_eq!(market_currency(Market::Cn), "CNY");
    }

    #[test]
    fn test_epoch_to_date() {
        // 2026-01-16 00:00:00 UTC
        let date = YahooAdapter::epoch_to_date(1768521600).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
    }

    #[test]
    fn test_options_response_decodes() {
        let json = r#"{
            "optionChain": {
                "result": [{
                    "underlyingSymbol": "AAPL",
                    "expirationDates": [1768521600, 1771200000],
                    "options": [{
                        "expirationDate": 1768521600,
                        "calls": [{
                            "contractSymbol": "AAPL260116C00200000",
                            "strike": 200.0,
                            "lastPrice": 12.5,
                            "bid": 12.3,
                            "ask": 12.7,
                            "volume": 150,
                            "openInterest": 4200,
                            "impliedVolatility": 0.29,
                            "inTheMoney": true
                        }],
                        "puts": []
                    }]
                }]
            }
        }"#;

        let parsed: YahooOptionsResponse = serde_json::from_str(json).unwrap();
        let result = &parsed.option_chain.result[0];
        assert_eq!(result.expiration_dates.len(), 2);
        assert_eq!(result.options[0].calls[0].contract_symbol, "AAPL260116C00200000");
        assert_eq!(result.options[0].calls[0].open_interest, Some(4200));
    }

    #[test]
    fn test_quote_summary_response_decodes() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {"currency": "USD", "shortName": "Apple Inc.", "exchangeName": "NasdaqGS"},
                    "summaryDetail": {
                        "marketCap": {"raw": 3.1e12, "fmt": "3.1T"},
                        "trailingPE": {"raw": 32.5},
                        "dividendYield": {}
                    }
                }]
            }
        }"#;

        let parsed: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let result = &parsed.quote_summary.result[0];
        assert_eq!(result.price.as_ref().unwrap().currency.as_deref(), Some("USD"));
        let detail = result.summary_detail.as_ref().unwrap();
        assert_eq!(detail.trailing_pe.as_ref().unwrap().raw, Some(32.5));
        assert!(detail.dividend_yield.as_ref().unwrap().raw.is_none());
    }
}
