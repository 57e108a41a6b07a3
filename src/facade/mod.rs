//! Per-symbol compatibility façade.
//!
//! Analysis code written against the old single-vendor interface works
//! with one object per symbol and accessor-style methods. [`DataProvider`]
//! keeps that shape: it holds only the symbol string and a handle to the
//! shared [`MarketDataService`], and every accessor translates to exactly
//! one `fetch` call, unwrapping the type-erased payload back into the
//! typed model.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{
    Candle, CompanyInfo, DataPayload, DataType, EarningsEntry, FetchParams, Fundamentals,
    MarginRate, OptionChain, Quote,
};
use crate::service::MarketDataService;

/// Default trailing window for history fetches, in calendar days.
const DEFAULT_HISTORY_DAYS: u32 = 365;

/// Accessor-style view of one symbol over the shared service.
#[derive(Clone)]
pub struct DataProvider {
    service: Arc<MarketDataService>,
    symbol: String,
}

impl DataProvider {
    pub fn new(service: Arc<MarketDataService>, symbol: impl Into<String>) -> Self {
        Self {
            service,
            symbol: symbol.into(),
        }
    }

    /// The raw symbol this provider was created with.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Latest quote, or `None` when unavailable.
    pub async fn quote(&self) -> Result<Option<Quote>, MarketDataError> {
        let payload = self
            .service
            .fetch(DataType::Quote, &self.symbol, FetchParams::default())
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::Quote(q) => Some(q.clone()),
            _ => None,
        }))
    }

    /// Daily bars over the trailing `days` window (365 when `None`).
    pub async fn history(&self, days: Option<u32>) -> Result<Option<Vec<Candle>>, MarketDataError> {
        let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
        let payload = self
            .service
            .fetch(DataType::History, &self.symbol, FetchParams::history_days(days))
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::History(bars) => Some(bars.clone()),
            _ => None,
        }))
    }

    /// Valuation ratios.
    pub async fn fundamentals(&self) -> Result<Option<Fundamentals>, MarketDataError> {
        let payload = self
            .service
            .fetch(DataType::Fundamentals, &self.symbol, FetchParams::default())
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::Fundamentals(f) => Some(f.clone()),
            _ => None,
        }))
    }

    /// Company profile.
    pub async fn info(&self) -> Result<Option<CompanyInfo>, MarketDataError> {
        let payload = self
            .service
            .fetch(DataType::Info, &self.symbol, FetchParams::default())
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::Info(i) => Some(i.clone()),
            _ => None,
        }))
    }

    /// Option chain at `expiry` (nearest expiry when `None`).
    pub async fn option_chain(
        &self,
        expiry: Option<NaiveDate>,
    ) -> Result<Option<OptionChain>, MarketDataError> {
        let params = match expiry {
            Some(date) => FetchParams::chain_expiry(date),
            None => FetchParams::default(),
        };
        let payload = self
            .service
            .fetch(DataType::OptionsChain, &self.symbol, params)
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::OptionsChain(chain) => Some(chain.clone()),
            _ => None,
        }))
    }

    /// Available option expiration dates.
    pub async fn option_expirations(&self) -> Result<Option<Vec<NaiveDate>>, MarketDataError> {
        let payload = self
            .service
            .fetch(
                DataType::OptionsExpirations,
                &self.symbol,
                FetchParams::default(),
            )
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::OptionsExpirations(dates) => Some(dates.clone()),
            _ => None,
        }))
    }

    /// Historical earnings reports.
    pub async fn earnings(&self) -> Result<Option<Vec<EarningsEntry>>, MarketDataError> {
        let payload = self
            .service
            .fetch(DataType::Earnings, &self.symbol, FetchParams::default())
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::Earnings(entries) => Some(entries.clone()),
            _ => None,
        }))
    }

    /// Margin trading terms.
    pub async fn margin_rate(&self) -> Result<Option<MarginRate>, MarketDataError> {
        let payload = self
            .service
            .fetch(DataType::MarginRate, &self.symbol, FetchParams::default())
            .await?;
        Ok(payload.and_then(|p| match p.as_ref() {
            DataPayload::MarginRate(rate) => Some(rate.clone()),
            _ => None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchRequest, Market};
    use crate::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct StubAdapter {
        config: AdapterConfig,
        runtime: AdapterRuntime,
    }

    impl StubAdapter {
        fn new() -> Self {
            Self {
                config: AdapterConfig {
                    name: "STUB",
                    priority: 10,
                    enabled: true,
                    data_types: &[DataType::Quote, DataType::History],
                    markets: &[Market::Us],
                },
                runtime: AdapterRuntime::new(),
            }
        }
    }

    #[async_trait]
    impl VendorAdapter for StubAdapter {
        fn config(&self) -> &AdapterConfig {
            &self.config
        }

        fn runtime(&self) -> &AdapterRuntime {
            &self.runtime
        }

        async fn quote(&self, _request: &FetchRequest) -> Result<Quote, MarketDataError> {
            Ok(Quote::new(
                Utc::now(),
                dec!(99.5),
                "USD".to_string(),
                "STUB".to_string(),
            ))
        }

        async fn history(&self, request: &FetchRequest) -> Result<Vec<Candle>, MarketDataError> {
            let days = request.params.days.unwrap_or(0) as usize;
            Ok(vec![
                Candle {
                    timestamp: Utc::now(),
                    open: dec!(1),
                    high: dec!(2),
                    low: dec!(1),
                    close: dec!(2),
                    volume: dec!(1000),
                };
                days.min(3)
            ])
        }
    }

    fn provider(symbol: &str) -> DataProvider {
        let service = Arc::new(MarketDataService::new(vec![Arc::new(StubAdapter::new())]));
        DataProvider::new(service, symbol)
    }

    #[tokio::test]
    async fn test_quote_accessor_unwraps_payload() {
        let quote = provider("AAPL").quote().await.unwrap().unwrap();
        assert_eq!(quote.close, dec!(99.5));
        assert_eq!(quote.source, "STUB");
    }

    #[tokio::test]
    async fn test_history_accessor_passes_window() {
        let bars = provider("AAPL").history(Some(90)).await.unwrap().unwrap();
        assert_eq!(bars.len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_data_type_yields_none() {
        let margin = provider("AAPL").margin_rate().await.unwrap();
        assert!(margin.is_none());
    }
}
