//! Option contract identity and symbology.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionRight {
    /// Call option.
    Call,
    /// Put option.
    Put,
}

impl OptionRight {
    /// Single-letter code used in contract symbols.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Leg action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionAction {
    /// Long the contract.
    Buy,
    /// Short the contract.
    Sell,
}

impl OptionAction {
    /// +1 for buy, -1 for sell.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    /// Opposite action, used to offset a leg.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OptionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A single listed contract on the configured underlying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionContract {
    symbol: String,
    strike: Decimal,
    expiry: NaiveDate,
    right: OptionRight,
}

impl OptionContract {
    /// Build a contract and derive its symbol from `prefix`.
    #[must_use]
    pub fn new(prefix: &str, expiry: NaiveDate, right: OptionRight, strike: Decimal) -> Self {
        Self {
            symbol: contract_symbol(prefix, expiry, right, strike),
            strike,
            expiry,
            right,
        }
    }

    /// Contract symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }

    /// Expiration date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// Call or put.
    #[must_use]
    pub const fn right(&self) -> OptionRight {
        self.right
    }

    /// Intrinsic value per share at the given underlying price.
    #[must_use]
    pub fn intrinsic_value(&self, underlying: Decimal) -> Decimal {
        let raw = match self.right {
            OptionRight::Call => underlying - self.strike,
            OptionRight::Put => self.strike - underlying,
        };
        raw.max(Decimal::ZERO)
    }
}

/// Contract symbol: `<prefix><YYMMDD><C|P><strike*1000, 8 digits>`.
///
/// `contract_symbol("SPXW", 2025-10-19, Call, 6000)` is `SPXW251019C06000000`.
#[must_use]
pub fn contract_symbol(prefix: &str, expiry: NaiveDate, right: OptionRight, strike: Decimal) -> String {
    let millis = (strike * Decimal::ONE_THOUSAND)
        .round()
        .to_u64()
        .unwrap_or_default();
    format!(
        "{prefix}{}{}{millis:08}",
        expiry.format("%y%m%d"),
        right.code()
    )
}

/// Strike nearest `price` on an `increment` grid, rounding half up.
#[must_use]
pub fn atm_strike(price: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return price;
    }
    ((price / increment) + Decimal::new(5, 1)).floor() * increment
}
