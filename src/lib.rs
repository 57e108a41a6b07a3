//! OptionSight Market Data Crate
//!
//! This crate provides provider-agnostic market data aggregation
//! for the OptionSight research platform.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple markets: US, Hong Kong, mainland China
//! - Multiple vendors: Yahoo Finance, EastMoney, Alpha Vantage, Finnhub
//! - Ordered failover with a rate-limit priority penalty
//! - Request deduplication, bounded LRU + TTL caching, per-fetch metrics
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   DataProvider   | --> |  MarketDataService|  (per-symbol facade / orchestrator)
//! +------------------+     +------------------+
//!                              |      |      |
//!                   +----------+      |      +-----------+
//!                   v                 v                  v
//!           +-----------+     +-------------+    +-----------------+
//!           | DataCache |     | Deduplicator|    | MetricsCollector|
//!           +-----------+     +-------------+    +-----------------+
//!                                     |
//!                                     v
//!                          +--------------------+
//!                          | ordered adapters   |  (Yahoo, EastMoney, ...)
//!                          +--------------------+
//!                                     |
//!                                     v
//!                          +--------------------+
//!                          |   vendor APIs      |
//!                          +--------------------+
//! ```
//!
//! Per request the service detects the market from the symbol spelling,
//! checks the cache, collapses concurrent identical requests into one
//! upstream call, and walks the candidate adapters in effective-priority
//! order until one succeeds. A request for which every vendor fails
//! resolves to `Ok(None)` — data-unavailable is a normal outcome here,
//! not an error.
//!
//! # Core Types
//!
//! - [`MarketDataService`] - the orchestrating façade; construct once, share via `Arc`
//! - [`DataProvider`] - per-symbol accessor view for legacy call sites
//! - [`VendorAdapter`] - contract every vendor adapter implements
//! - [`DataType`] / [`Market`] - the request space
//! - [`DataPayload`] - type-erased fetch result

pub mod errors;
pub mod facade;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod service;

// Re-export all public types from models
pub use models::{
    CacheKey, Candle, CompanyInfo, DataPayload, DataType, EarningsEntry, FetchParams, FetchRequest,
    Fundamentals, MarginRate, Market, OptionChain, OptionContract, Quote,
};

// Re-export resolver functions
pub use resolver::{detect, detect_and_normalize, normalize};

// Re-export provider types
pub use provider::{
    AdapterConfig, AdapterHealth, AdapterRuntime, AlphaVantageAdapter, EastMoneyAdapter,
    FinnhubAdapter, VendorAdapter, YahooAdapter,
};

// Re-export service types
pub use service::{
    CacheStats, DedupStats, FetchRecord, LatencyPercentiles, MarketDataService,
    MarketDataServiceBuilder, MetricsFilter, MetricsSummary, ProviderHealthReport, ProviderStatus,
    ServiceConfig,
};

// Re-export facade
pub use facade::DataProvider;

// Re-export error types
pub use errors::{ErrorKind, MarketDataError};
