//! Trade descriptor construction and liquidity validation.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::descriptor::TradeDescriptor;
use super::option_leg::OptionLeg;
use super::structure::StructureKind;
use crate::domain::strike_selection::StrikeResult;

/// Builds descriptors for one structure kind at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct TradeBuilder {
    kind: StructureKind,
    multiplier: Decimal,
    underlying_price: Decimal,
    as_of: NaiveDateTime,
}

impl TradeBuilder {
    /// Create a builder for `kind`, priced against `underlying_price` at `as_of`.
    #[must_use]
    pub const fn new(
        kind: StructureKind,
        multiplier: Decimal,
        underlying_price: Decimal,
        as_of: NaiveDateTime,
    ) -> Self {
        Self {
            kind,
            multiplier,
            underlying_price,
            as_of,
        }
    }

    /// Build a credit structure from a strike search result.
    ///
    /// Per contract: `max_loss = distance * multiplier - credit * multiplier`
    /// and `max_profit = credit * multiplier`. Position totals scale by
    /// `quantity`.
    #[must_use]
    pub fn build(&self, result: &StrikeResult, quantity: u32) -> TradeDescriptor {
        let legs: Vec<OptionLeg> = result.legs.iter().map(|l| l.with_quantity(1)).collect();
        let credit: Decimal = legs.iter().map(OptionLeg::cash_flow).sum();
        let max_loss = result.distance * self.multiplier - credit * self.multiplier;
        let max_profit = credit * self.multiplier;
        let ratio = (max_loss > Decimal::ZERO).then(|| max_profit / max_loss);

        TradeDescriptor::new(
            self.kind,
            legs,
            quantity,
            self.multiplier,
            result.distance,
            max_loss,
            Some(max_profit),
            ratio,
            self.underlying_price,
            self.as_of,
        )
    }

    /// Build a debit structure from priced legs.
    ///
    /// Maximum loss is the debit paid. Maximum profit is unbounded.
    #[must_use]
    pub fn build_debit(&self, legs: &[OptionLeg], distance: Decimal, quantity: u32) -> TradeDescriptor {
        let legs: Vec<OptionLeg> = legs.iter().map(|l| l.with_quantity(1)).collect();
        let debit: Decimal = -legs.iter().map(OptionLeg::cash_flow).sum::<Decimal>();

        TradeDescriptor::new(
            self.kind,
            legs,
            quantity,
            self.multiplier,
            distance,
            debit * self.multiplier,
            None,
            None,
            self.underlying_price,
            self.as_of,
        )
    }
}

/// Reject a descriptor with any illiquid leg.
///
/// A leg fails on a non-positive bid or when `(ask - bid) / mid` exceeds
/// `max_spread_pct` (a fraction, `0.25` = 25%).
pub fn validate_liquidity(descriptor: &TradeDescriptor, max_spread_pct: Decimal) -> Result<(), String> {
    for leg in descriptor.legs() {
        if leg.bid() <= Decimal::ZERO {
            return Err(format!("{} has non-positive bid {}", leg.symbol(), leg.bid()));
        }
        let mid = leg.mid();
        let spread_pct = (leg.ask() - leg.bid()) / mid;
        if spread_pct > max_spread_pct {
            return Err(format!(
                "{} spread {:.1}% exceeds {:.1}%",
                leg.symbol(),
                spread_pct * Decimal::ONE_HUNDRED,
                max_spread_pct * Decimal::ONE_HUNDRED
            ));
        }
    }
    Ok(())
}
