use chrono::NaiveDate;

use super::{
    Candle, CompanyInfo, DataType, EarningsEntry, Fundamentals, MarginRate, OptionChain, Quote,
};

/// Type-erased result of one fetch.
///
/// The service and cache operate on this enum so the failover loop,
/// deduplicator, and cache stay generic over data types; the per-symbol
/// facade unwraps it back into the typed models.
#[derive(Clone, Debug)]
pub enum DataPayload {
    Quote(Quote),
    History(Vec<Candle>),
    Fundamentals(Fundamentals),
    Info(CompanyInfo),
    OptionsChain(OptionChain),
    OptionsExpirations(Vec<NaiveDate>),
    Earnings(Vec<EarningsEntry>),
    MarginRate(MarginRate),
}

impl DataPayload {
    /// The data type this payload answers.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Quote(_) => DataType::Quote,
            Self::History(_) => DataType::History,
            Self::Fundamentals(_) => DataType::Fundamentals,
            Self::Info(_) => DataType::Info,
            Self::OptionsChain(_) => DataType::OptionsChain,
            Self::OptionsExpirations(_) => DataType::OptionsExpirations,
            Self::Earnings(_) => DataType::Earnings,
            Self::MarginRate(_) => DataType::MarginRate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payload_data_type() {
        let payload = DataPayload::Quote(Quote::new(
            Utc::now(),
            dec!(1),
            "USD".to_string(),
            "TEST".to_string(),
        ));
        assert_eq!(payload.data_type(), DataType::Quote);

        let payload = DataPayload::OptionsExpirations(vec![]);
        assert_eq!(payload.data_type(), DataType::OptionsExpirations);
    }
}
