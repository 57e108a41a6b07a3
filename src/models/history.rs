use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One historical OHLCV bar.
///
/// Unlike [`Quote`](super::Quote), all price fields are required — vendors
/// that cannot produce a full bar for a session omit the bar entirely.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candle {
    /// Bar timestamp (session open, UTC)
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_roundtrips_through_serde() {
        let candle = Candle {
            timestamp: Utc::now(),
            open: dec!(10),
            high: dec!(12),
            low: dec!(9.5),
            close: dec!(11),
            volume: dec!(100000),
        };
        let json = serde_json::to_string(&candle).unwrap();
        let back: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.close, dec!(11));
    }
}
