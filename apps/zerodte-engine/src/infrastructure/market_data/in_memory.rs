//! In-memory market data store.
//!
//! Backs backtests and paper sessions. Loads a JSON document of the shape
//!
//! ```json
//! { "bars":   { "SPX": [ { "timestamp": "...", "open": "...", ... } ] },
//!   "quotes": { "SPXW251121C06000000": [ { "bid": "...", "ask": "...", ... } ] } }
//! ```
//!
//! Quote lookups return the latest quote stamped at or before the requested
//! time on the same day.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::domain::market_data::{Bar, Quote};

#[derive(Debug, Default, Deserialize)]
struct Dataset {
    #[serde(default)]
    bars: HashMap<String, Vec<Bar>>,
    #[serde(default)]
    quotes: HashMap<String, Vec<Quote>>,
}

#[derive(Debug, Default)]
struct Store {
    bars: HashMap<String, BTreeMap<NaiveDateTime, Bar>>,
    quotes: HashMap<String, BTreeMap<NaiveDateTime, Quote>>,
}

/// Market data held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    store: RwLock<Store>,
}

impl InMemoryMarketData {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON dataset.
    pub fn from_json_str(json: &str) -> Result<Self, MarketDataError> {
        let dataset: Dataset = serde_json::from_str(json).map_err(|e| MarketDataError::DataUnavailable {
            message: format!("invalid market data JSON: {e}"),
        })?;

        let data = Self::new();
        for (symbol, bars) in dataset.bars {
            data.insert_bars(&symbol, bars);
        }
        for (symbol, quotes) in dataset.quotes {
            for quote in quotes {
                data.insert_quote(&symbol, quote);
            }
        }
        Ok(data)
    }

    /// Load a JSON dataset from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MarketDataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| MarketDataError::DataUnavailable {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let data = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), symbols = data.symbol_count(), "Market data loaded");
        Ok(data)
    }

    /// Add bars for `symbol`. A bar with an existing timestamp replaces it.
    pub fn insert_bars(&self, symbol: &str, bars: impl IntoIterator<Item = Bar>) {
        let mut store = self.store.write();
        let series = store.bars.entry(symbol.to_string()).or_default();
        for bar in bars {
            series.insert(bar.timestamp, bar);
        }
    }

    /// Add one quote for `symbol`.
    pub fn insert_quote(&self, symbol: &str, quote: Quote) {
        self.store
            .write()
            .quotes
            .entry(symbol.to_string())
            .or_default()
            .insert(quote.timestamp, quote);
    }

    /// Dates with at least one bar for `symbol`.
    #[must_use]
    pub fn dates(&self, symbol: &str) -> Vec<NaiveDate> {
        let store = self.store.read();
        store
            .bars
            .get(symbol)
            .map(|series| series.keys().map(NaiveDateTime::date).collect::<BTreeSet<_>>())
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    fn symbol_count(&self) -> usize {
        let store = self.store.read();
        store.bars.len() + store.quotes.len()
    }

    fn latest_quote(store: &Store, symbol: &str, at: NaiveDateTime) -> Option<Quote> {
        let day_start = at.date().and_time(NaiveTime::MIN);
        store
            .quotes
            .get(symbol)?
            .range(day_start..=at)
            .next_back()
            .map(|(_, q)| q.clone())
    }
}

#[async_trait]
impl MarketDataPort for InMemoryMarketData {
    async fn get_bars(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Bar>, MarketDataError> {
        let store = self.store.read();
        let Some(series) = store.bars.get(symbol) else {
            return Ok(Vec::new());
        };
        let start = date.and_time(NaiveTime::MIN);
        let end = start + Duration::days(1);
        Ok(series.range(start..end).map(|(_, b)| b.clone()).collect())
    }

    async fn get_quote(&self, symbol: &str, at: NaiveDateTime) -> Result<Option<Quote>, MarketDataError> {
        Ok(Self::latest_quote(&self.store.read(), symbol, at))
    }

    async fn get_quotes(
        &self,
        symbols: &[String],
        at: NaiveDateTime,
    ) -> Result<HashMap<String, Option<Quote>>, MarketDataError> {
        let store = self.store.read();
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), Self::latest_quote(&store, s, at)))
            .collect())
    }
}
