//! Vendor adapter trait definition.
//!
//! This module defines the core `VendorAdapter` trait that all
//! market data vendors must implement.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{
    Candle, CompanyInfo, DataPayload, DataType, EarningsEntry, FetchRequest, Fundamentals,
    MarginRate, OptionChain, Quote,
};

use super::config::AdapterConfig;
use super::runtime::AdapterRuntime;

/// Trait for vendor adapters.
///
/// Implement this trait to add support for a new market data vendor.
/// An adapter wraps exactly one external vendor; the service uses its
/// static [`AdapterConfig`] to decide when it is a candidate and its
/// [`AdapterRuntime`] health state to order candidates per request.
///
/// Implement only the typed methods for the data types your config
/// declares; the rest default to `NotSupported`. The provided
/// [`fetch`](Self::fetch) dispatcher routes a [`FetchRequest`] to the
/// right typed method, so the service's failover loop stays generic.
///
/// Contract notes:
/// - A single call either returns or fails fast; adapters never retry
///   internally. Retry across vendors is the service's failover loop.
/// - Adapters bound their own network timeouts; the service adds an
///   outer timeout as a backstop.
/// - Adapters mutate only their own runtime state, and only through
///   `record_outcome` driven by the service. The shared cache,
///   deduplicator, and metrics are service-owned concerns.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use optionsight_market_data::provider::{AdapterConfig, AdapterRuntime, VendorAdapter};
///
/// struct MyAdapter {
///     config: AdapterConfig,
///     runtime: AdapterRuntime,
/// }
///
/// #[async_trait]
/// impl VendorAdapter for MyAdapter {
///     fn config(&self) -> &AdapterConfig {
///         &self.config
///     }
///
///     fn runtime(&self) -> &AdapterRuntime {
///         &self.runtime
///     }
///
///     // ... implement the typed methods your config declares
/// }
/// ```
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// Static configuration: name, priority, supported (data type, market) space.
    fn config(&self) -> &AdapterConfig;

    /// Mutable health state owned by this adapter.
    fn runtime(&self) -> &AdapterRuntime;

    /// Unique adapter name, from the config.
    fn id(&self) -> &'static str {
        self.config().name
    }

    /// Fetch the latest quote.
    async fn quote(&self, request: &FetchRequest) -> Result<Quote, MarketDataError> {
        Err(self.not_supported("quote", request))
    }

    /// Fetch daily OHLCV history over the window in `request.params.days`.
    async fn history(&self, request: &FetchRequest) -> Result<Vec<Candle>, MarketDataError> {
        Err(self.not_supported("history", request))
    }

    /// Fetch valuation and financial ratios.
    async fn fundamentals(&self, request: &FetchRequest) -> Result<Fundamentals, MarketDataError> {
        Err(self.not_supported("fundamentals", request))
    }

    /// Fetch the company profile.
    async fn company_info(&self, request: &FetchRequest) -> Result<CompanyInfo, MarketDataError> {
        Err(self.not_supported("company_info", request))
    }

    /// Fetch the option chain for the expiry in `request.params.expiry`
    /// (nearest expiry when absent).
    async fn options_chain(&self, request: &FetchRequest) -> Result<OptionChain, MarketDataError> {
        Err(self.not_supported("options_chain", request))
    }

    /// Fetch the available option expiration dates.
    async fn options_expirations(
        &self,
        request: &FetchRequest,
    ) -> Result<Vec<NaiveDate>, MarketDataError> {
        Err(self.not_supported("options_expirations", request))
    }

    /// Fetch historical earnings reports.
    async fn earnings(&self, request: &FetchRequest) -> Result<Vec<EarningsEntry>, MarketDataError> {
        Err(self.not_supported("earnings", request))
    }

    /// Fetch margin trading terms.
    async fn margin_rate(&self, request: &FetchRequest) -> Result<MarginRate, MarketDataError> {
        Err(self.not_supported("margin_rate", request))
    }

    /// Route a request to the typed method for its data type.
    async fn fetch(&self, request: &FetchRequest) -> Result<DataPayload, MarketDataError> {
        match request.data_type {
            DataType::Quote => self.quote(request).await.map(DataPayload::Quote),
            DataType::History => self.history(request).await.map(DataPayload::History),
            DataType::Fundamentals => self
                .fundamentals(request)
                .await
                .map(DataPayload::Fundamentals),
            DataType::Info => self.company_info(request).await.map(DataPayload::Info),
            DataType::OptionsChain => self
                .options_chain(request)
                .await
                .map(DataPayload::OptionsChain),
            DataType::OptionsExpirations => self
                .options_expirations(request)
                .await
                .map(DataPayload::OptionsExpirations),
            DataType::Earnings => self.earnings(request).await.map(DataPayload::Earnings),
            DataType::MarginRate => self.margin_rate(request).await.map(DataPayload::MarginRate),
        }
    }

    /// Build the standard `NotSupported` error for an unimplemented operation.
    fn not_supported(&self, operation: &str, _request: &FetchRequest) -> MarketDataError {
        MarketDataError::NotSupported {
            operation: operation.to_string(),
            provider: self.id().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::{FetchParams, Market};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct QuoteOnlyAdapter {
        config: AdapterConfig,
        runtime: AdapterRuntime,
    }

    impl QuoteOnlyAdapter {
        fn new() -> Self {
            Self {
                config: AdapterConfig {
                    name: "QUOTE_ONLY",
                    priority: 10,
                    enabled: true,
                    data_types: &[DataType::Quote],
                    markets: &[Market::Us],
                },
                runtime: AdapterRuntime::new(),
            }
        }
    }

    #[async_trait]
    impl VendorAdapter for QuoteOnlyAdapter {
        fn config(&self) -> &AdapterConfig {
            &self.config
        }

        fn runtime(&self) -> &AdapterRuntime {
            &self.runtime
        }

        async fn quote(&self, _request: &FetchRequest) -> Result<Quote, MarketDataError> {
            Ok(Quote::new(
                Utc::now(),
                dec!(42),
                "USD".to_string(),
                "QUOTE_ONLY".to_string(),
            ))
        }
    }

    fn request(data_type: DataType) -> FetchRequest {
        FetchRequest {
            data_type,
            symbol: Arc::from("AAPL"),
            market: Market::Us,
            params: FetchParams::default(),
        }
    }

    #[tokio::test]
    async fn test_fetch_dispatches_to_typed_method() {
        let adapter = QuoteOnlyAdapter::new();
        let payload = adapter.fetch(&request(DataType::Quote)).await.unwrap();
        assert!(matches!(payload, DataPayload::Quote(q) if q.close == dec!(42)));
    }

    #[tokio::test]
    async fn test_unimplemented_method_is_not_supported() {
        let adapter = QuoteOnlyAdapter::new();
        let err = adapter
            .fetch(&request(DataType::OptionsChain))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_id_comes_from_config() {
        let adapter = QuoteOnlyAdapter::new();
        assert_eq!(adapter.id(), "QUOTE_ONLY");
    }
}
