//! Snapshot of option quotes used as the strike search oracle.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::optimizer::StructureQuote;
use crate::domain::market_data::{OptionContract, Quote};
use crate::domain::trade::{OptionLeg, StructureKind};

/// Quotes keyed by contract symbol, fetched before the search starts.
#[derive(Debug, Clone, Default)]
pub struct QuoteBoard {
    quotes: HashMap<String, Quote>,
}

impl QuoteBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a batch fetch, dropping absent quotes.
    #[must_use]
    pub fn from_batch(batch: HashMap<String, Option<Quote>>) -> Self {
        Self {
            quotes: batch
                .into_iter()
                .filter_map(|(symbol, quote)| quote.map(|q| (symbol, q)))
                .collect(),
        }
    }

    /// Insert or replace a quote.
    pub fn insert(&mut self, symbol: impl Into<String>, quote: Quote) {
        self.quotes.insert(symbol.into(), quote);
    }

    /// Look up a quote.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Number of quotes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// True when no quotes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Price `kind` at `distance` from the board.
    ///
    /// Returns `None` when any leg lacks a usable quote, the net credit is not
    /// positive, or the per-share max loss (`distance - credit`) is not
    /// positive.
    #[must_use]
    pub fn price_structure(
        &self,
        kind: StructureKind,
        prefix: &str,
        expiry: NaiveDate,
        center: Decimal,
        distance: Decimal,
        offset: Decimal,
    ) -> Option<StructureQuote> {
        let legs = self.price_legs(kind, prefix, expiry, center, distance, offset)?;
        let net_credit: Decimal = legs.iter().map(OptionLeg::cash_flow).sum();
        let max_loss = distance - net_credit;
        if net_credit <= Decimal::ZERO || max_loss <= Decimal::ZERO {
            return None;
        }
        Some(StructureQuote {
            net_credit,
            max_loss,
            legs,
        })
    }

    /// Price every leg of `kind`, `None` if any quote is missing or unusable.
    #[must_use]
    pub fn price_legs(
        &self,
        kind: StructureKind,
        prefix: &str,
        expiry: NaiveDate,
        center: Decimal,
        distance: Decimal,
        offset: Decimal,
    ) -> Option<Vec<OptionLeg>> {
        kind.legs(center, distance, offset)
            .into_iter()
            .map(|t| {
                let contract = OptionContract::new(prefix, expiry, t.right, t.strike);
                let quote = self.get(contract.symbol()).filter(|q| q.is_usable())?;
                Some(OptionLeg::new(contract, t.action, 1, quote.bid, quote.ask))
            })
            .collect()
    }

    /// Every contract symbol `kind` touches at `distances`, usually the
    /// output of [`search_distances`](super::search_distances).
    #[must_use]
    pub fn symbols_for_search(
        kind: StructureKind,
        prefix: &str,
        expiry: NaiveDate,
        center: Decimal,
        distances: &[Decimal],
        offset: Decimal,
    ) -> Vec<String> {
        let mut symbols = Vec::new();
        for &distance in distances {
            for t in kind.legs(center, distance, offset) {
                let symbol = OptionContract::new(prefix, expiry, t.right, t.strike).symbol().to_string();
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        symbols
    }
}
