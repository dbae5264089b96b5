//! Priced option leg.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_data::{OptionAction, OptionContract, OptionRight};

/// One leg of a structure with the quote it was priced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLeg {
    contract: OptionContract,
    action: OptionAction,
    quantity: u32,
    bid: Decimal,
    ask: Decimal,
}

impl OptionLeg {
    /// Create a leg.
    #[must_use]
    pub const fn new(
        contract: OptionContract,
        action: OptionAction,
        quantity: u32,
        bid: Decimal,
        ask: Decimal,
    ) -> Self {
        Self {
            contract,
            action,
            quantity,
            bid,
            ask,
        }
    }

    /// Same leg with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Contract.
    #[must_use]
    pub const fn contract(&self) -> &OptionContract {
        &self.contract
    }

    /// Contract symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.contract.symbol()
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.contract.strike()
    }

    /// Call or put.
    #[must_use]
    pub const fn right(&self) -> OptionRight {
        self.contract.right()
    }

    /// Buy or sell.
    #[must_use]
    pub const fn action(&self) -> OptionAction {
        self.action
    }

    /// Contracts on this leg.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Bid at pricing time.
    #[must_use]
    pub const fn bid(&self) -> Decimal {
        self.bid
    }

    /// Ask at pricing time.
    #[must_use]
    pub const fn ask(&self) -> Decimal {
        self.ask
    }

    /// Conservative fill: sells at the bid, buys at the ask.
    #[must_use]
    pub const fn fill_price(&self) -> Decimal {
        match self.action {
            OptionAction::Sell => self.bid,
            OptionAction::Buy => self.ask,
        }
    }

    /// Per-share cash flow of one unit: positive when selling.
    #[must_use]
    pub fn cash_flow(&self) -> Decimal {
        -Decimal::from(self.action.sign()) * self.fill_price()
    }

    /// Midpoint of bid and ask.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}
