//! Option or underlying quote.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-of-book quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last trade price.
    pub last: Decimal,
    /// Session volume.
    #[serde(default)]
    pub volume: u64,
    /// Quote time.
    pub timestamp: NaiveDateTime,
}

impl Quote {
    /// Create a quote.
    #[must_use]
    pub const fn new(
        bid: Decimal,
        ask: Decimal,
        last: Decimal,
        volume: u64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            bid,
            ask,
            last,
            volume,
            timestamp,
        }
    }

    /// Zeroed quote used when a fetch times out.
    #[must_use]
    pub const fn empty(timestamp: NaiveDateTime) -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, 0, timestamp)
    }

    /// Midpoint of bid and ask.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Ask minus bid.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// A quote is usable when it has a positive bid and an uncrossed ask.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask >= self.bid
    }
}
