//! Immutable trade descriptor.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::option_leg::OptionLeg;
use super::structure::StructureKind;
use crate::domain::market_data::OptionRight;

/// A fully priced structure ready for approval and execution.
///
/// There is no mutating API. Rebuild to change anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDescriptor {
    id: Uuid,
    kind: StructureKind,
    legs: Vec<OptionLeg>,
    quantity: u32,
    multiplier: Decimal,
    distance: Decimal,
    net_premium: Decimal,
    max_loss_per_contract: Decimal,
    max_profit_per_contract: Option<Decimal>,
    win_loss_ratio: Option<Decimal>,
    underlying_price: Decimal,
    strikes_repr: String,
    created_at: NaiveDateTime,
}

impl TradeDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        kind: StructureKind,
        legs: Vec<OptionLeg>,
        quantity: u32,
        multiplier: Decimal,
        distance: Decimal,
        max_loss_per_contract: Decimal,
        max_profit_per_contract: Option<Decimal>,
        win_loss_ratio: Option<Decimal>,
        underlying_price: Decimal,
        created_at: NaiveDateTime,
    ) -> Self {
        let net_premium = legs.iter().map(OptionLeg::cash_flow).sum();
        let strikes_repr = strikes_repr(&legs);
        Self {
            id: Uuid::new_v4(),
            kind,
            legs,
            quantity,
            multiplier,
            distance,
            net_premium,
            max_loss_per_contract,
            max_profit_per_contract,
            win_loss_ratio,
            underlying_price,
            strikes_repr,
            created_at,
        }
    }

    /// Descriptor id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Structure kind.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.kind
    }

    /// Legs, in template order. Quantities are per contract of the structure.
    #[must_use]
    pub fn legs(&self) -> &[OptionLeg] {
        &self.legs
    }

    /// Number of structures.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Option contract multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> Decimal {
        self.multiplier
    }

    /// Wing distance the structure was built with.
    #[must_use]
    pub const fn distance(&self) -> Decimal {
        self.distance
    }

    /// Net premium per share of one structure. Positive for a credit.
    #[must_use]
    pub const fn net_premium(&self) -> Decimal {
        self.net_premium
    }

    /// Premium received (or paid, negative) for the whole position.
    #[must_use]
    pub fn total_premium(&self) -> Decimal {
        self.net_premium * self.multiplier * Decimal::from(self.quantity)
    }

    /// Maximum loss of one structure in currency.
    #[must_use]
    pub const fn max_loss_per_contract(&self) -> Decimal {
        self.max_loss_per_contract
    }

    /// Maximum loss of the whole position in currency.
    #[must_use]
    pub fn max_loss(&self) -> Decimal {
        self.max_loss_per_contract * Decimal::from(self.quantity)
    }

    /// Maximum profit of one structure, `None` when unbounded.
    #[must_use]
    pub const fn max_profit_per_contract(&self) -> Option<Decimal> {
        self.max_profit_per_contract
    }

    /// Maximum profit of the whole position, `None` when unbounded.
    #[must_use]
    pub fn max_profit(&self) -> Option<Decimal> {
        self.max_profit_per_contract
            .map(|p| p * Decimal::from(self.quantity))
    }

    /// Credit divided by maximum loss. `None` for debit structures.
    #[must_use]
    pub const fn win_loss_ratio(&self) -> Option<Decimal> {
        self.win_loss_ratio
    }

    /// Underlying price when the descriptor was built.
    #[must_use]
    pub const fn underlying_price(&self) -> Decimal {
        self.underlying_price
    }

    /// Human-readable strikes, e.g. `5950/6000P 6000/6050C`.
    #[must_use]
    pub fn strikes_repr(&self) -> &str {
        &self.strikes_repr
    }

    /// Build time.
    #[must_use]
    pub const fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    /// Expiration of the legs.
    #[must_use]
    pub fn expiry(&self) -> Option<NaiveDate> {
        self.legs.first().map(|l| l.contract().expiry())
    }

    /// Contracts across all legs, the unit used by the risk counters.
    #[must_use]
    pub fn total_contracts(&self) -> u32 {
        self.legs
            .iter()
            .fold(0u32, |total, leg| total.saturating_add(leg.quantity()))
            .saturating_mul(self.quantity)
    }
}

fn strikes_repr(legs: &[OptionLeg]) -> String {
    let side = |right: OptionRight| {
        let mut strikes: Vec<Decimal> = legs
            .iter()
            .filter(|l| l.right() == right)
            .map(OptionLeg::strike)
            .collect();
        strikes.sort();
        strikes.dedup();
        if strikes.is_empty() {
            return None;
        }
        let joined = strikes
            .iter()
            .map(|s| s.normalize().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Some(format!("{joined}{}", right.code()))
    };

    [side(OptionRight::Put), side(OptionRight::Call)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}
