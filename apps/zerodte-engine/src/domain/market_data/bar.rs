//! Intraday OHLCV bar.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One intraday bar, timestamped in exchange-local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time.
    pub timestamp: NaiveDateTime,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume. Zero for indices that do not print volume.
    #[serde(default)]
    pub volume: u64,
}

impl Bar {
    /// Create a bar.
    #[must_use]
    pub const fn new(
        timestamp: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// High minus low.
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// True when the bar closed above its open.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    /// Trading date of the bar.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}
