//! Market Data Port (Driven Port)
//!
//! Intraday bars and option quotes for the decision pipeline. A missing quote
//! is a normal outcome (`Ok(None)`), not an error.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::market_data::{Bar, Quote};

/// Market data error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketDataError {
    /// Connection error.
    #[error("Market data connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Symbol not known to the provider.
    #[error("Symbol not found: {symbol}")]
    SymbolNotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// Data unavailable.
    #[error("Market data unavailable: {message}")]
    DataUnavailable {
        /// Error details.
        message: String,
    },

    /// Provider did not answer in time.
    #[error("Market data request timed out after {millis} ms")]
    Timeout {
        /// Bound that elapsed.
        millis: u64,
    },
}

/// Port for bars and quotes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Bars for `symbol` on `date`, oldest first. Empty when the provider has none.
    async fn get_bars(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Bar>, MarketDataError>;

    /// Latest quote for `symbol` as of `at`.
    async fn get_quote(&self, symbol: &str, at: NaiveDateTime) -> Result<Option<Quote>, MarketDataError>;

    /// Quotes for many symbols as of `at`. Every requested symbol appears in
    /// the result, `None` where no quote exists.
    async fn get_quotes(
        &self,
        symbols: &[String],
        at: NaiveDateTime,
    ) -> Result<HashMap<String, Option<Quote>>, MarketDataError>;
}
