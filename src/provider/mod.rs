//! Vendor adapter module.
//!
//! One adapter per external data vendor, all implementing the
//! [`VendorAdapter`] contract:
//! - `yahoo` - Yahoo Finance (all markets; quotes, history, profile,
//!   fundamentals, earnings, options)
//! - `eastmoney` - EastMoney push2 API (CN/HK; quotes, history, margin)
//! - `alpha_vantage` - Alpha Vantage (US; quotes, history, fundamentals,
//!   earnings)
//! - `finnhub` - Finnhub (US; quotes, profile, earnings)

pub mod alpha_vantage;
mod config;
pub mod eastmoney;
pub mod finnhub;
mod runtime;
mod traits;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageAdapter;
pub use config::AdapterConfig;
pub use eastmoney::EastMoneyAdapter;
pub use finnhub::FinnhubAdapter;
pub use runtime::{AdapterHealth, AdapterRuntime};
pub use traits::VendorAdapter;
pub use yahoo::YahooAdapter;
