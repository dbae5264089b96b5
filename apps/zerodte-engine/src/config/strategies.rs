//! Strategy sequence configuration.
//!
//! Steps run in list order; when the sequence is dependent, step k may only
//! trade after step k-1 traded the same day.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::signal::SignalParams;
use crate::domain::trade::StructureKind;

/// One step of the trading sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Unique step name, used by the sequence and structure limits.
    pub name: String,
    /// Structure traded by this step.
    pub kind: StructureKind,
    /// Structures per trade.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Entry signal parameters.
    #[serde(default)]
    pub signal: SignalParams,
    /// Narrowest wing distance searched.
    pub min_distance: Decimal,
    /// Widest wing distance searched. Debit structures trade at `min_distance`.
    pub max_distance: Decimal,
    /// Distance grid step.
    #[serde(default = "default_distance_step")]
    pub distance_step: Decimal,
    /// Target `credit / max_loss`.
    #[serde(default = "default_target_ratio")]
    pub target_ratio: Decimal,
    /// Acceptable distance from the target ratio.
    #[serde(default = "default_ratio_tolerance")]
    pub ratio_tolerance: Decimal,
    /// Short strike offset from center for condors and credit spreads.
    #[serde(default)]
    pub short_offset: Decimal,
    /// Live only: try narrower wings from this distance upward.
    #[serde(default)]
    pub wing_floor: Option<Decimal>,
    /// Reject legs whose `(ask - bid) / mid` exceeds this fraction.
    #[serde(default)]
    pub max_spread_pct: Option<Decimal>,
    /// Partial profit taking on debit hedges.
    #[serde(default)]
    pub hedge_exit: Option<HedgeExitConfig>,
}

/// Partial exit rule for a long hedge leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeExitConfig {
    /// Exit once the leg's mid reaches entry price times this multiple.
    #[serde(default = "default_profit_multiple")]
    pub profit_multiple: Decimal,
    /// Share of the leg's remaining contracts to close.
    #[serde(default = "default_exit_fraction")]
    pub exit_fraction: Decimal,
}

impl StrategyConfig {
    /// Validate one step.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("strategy name must not be empty".to_string());
        }
        if self.quantity == 0 {
            return Err(format!("{}: quantity must be positive", self.name));
        }
        if self.min_distance <= Decimal::ZERO || self.min_distance > self.max_distance {
            return Err(format!("{}: need 0 < min_distance <= max_distance", self.name));
        }
        if self.distance_step <= Decimal::ZERO {
            return Err(format!("{}: distance_step must be positive", self.name));
        }
        if self.kind.is_credit() && self.target_ratio <= Decimal::ZERO {
            return Err(format!("{}: target_ratio must be positive", self.name));
        }
        if self.ratio_tolerance < Decimal::ZERO || self.short_offset < Decimal::ZERO {
            return Err(format!("{}: ratio_tolerance and short_offset must be non-negative", self.name));
        }
        if let Some(pct) = self.max_spread_pct
            && pct <= Decimal::ZERO
        {
            return Err(format!("{}: max_spread_pct must be positive", self.name));
        }
        if let Some(exit) = self.hedge_exit
            && (exit.profit_multiple <= Decimal::ONE
                || exit.exit_fraction <= Decimal::ZERO
                || exit.exit_fraction > Decimal::ONE)
        {
            return Err(format!(
                "{}: hedge_exit needs profit_multiple > 1 and exit_fraction in (0, 1]",
                self.name
            ));
        }
        self.signal.validate().map_err(|e| format!("{}: {e}", self.name))
    }
}

const fn default_quantity() -> u32 {
    1
}

const fn default_distance_step() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 0)
}

const fn default_target_ratio() -> Decimal {
    Decimal::ONE
}

const fn default_ratio_tolerance() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 2)
}

const fn default_profit_multiple() -> Decimal {
    Decimal::TWO
}

const fn default_exit_fraction() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 1)
}
