//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `market` - Trading jurisdiction enum (`Market`)
//! - `data_type` - Requestable data kinds and their cache TTL policy (`DataType`)
//! - `quote` - Latest-quote data (`Quote`)
//! - `history` - Historical OHLCV bars (`Candle`)
//! - `options` - Option chain data (`OptionChain`, `OptionContract`)
//! - `fundamentals` - Fundamentals, company info, earnings, margin data
//! - `request` - Fetch request plumbing (`FetchParams`, `CacheKey`, `FetchRequest`)
//! - `payload` - The type-erased fetch result (`DataPayload`)

mod data_type;
mod fundamentals;
mod history;
mod market;
mod options;
mod payload;
mod quote;
mod request;

pub use data_type::DataType;
pub use fundamentals::{CompanyInfo, EarningsEntry, Fundamentals, MarginRate};
pub use history::Candle;
pub use market::Market;
pub use options::{OptionChain, OptionContract};
pub use payload::DataPayload;
pub use quote::Quote;
pub use request::{CacheKey, FetchParams, FetchRequest};
