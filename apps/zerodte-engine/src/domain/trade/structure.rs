//! Structure kinds and their leg layouts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_data::{OptionAction, OptionRight};

/// Supported multi-leg structures.
///
/// Iron structures and credit spreads are sold for a credit. Straddles and
/// strangles are bought as debit hedges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Short ATM put and call, long wings `distance` away.
    IronButterfly,
    /// Short put and call `offset` from center, long wings `distance` further.
    IronCondor,
    /// Long ATM put and call.
    Straddle,
    /// Long put and call `distance` from center.
    Strangle,
    /// Short put `offset` below center, long put `distance` further.
    PutCreditSpread,
    /// Short call `offset` above center, long call `distance` further.
    CallCreditSpread,
}

/// Strike, right and action of one leg before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegTemplate {
    /// Strike price.
    pub strike: Decimal,
    /// Call or put.
    pub right: OptionRight,
    /// Buy or sell.
    pub action: OptionAction,
}

impl LegTemplate {
    const fn new(strike: Decimal, right: OptionRight, action: OptionAction) -> Self {
        Self {
            strike,
            right,
            action,
        }
    }
}

impl StructureKind {
    /// Snake-case name used in config, logs and the sequence gate.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IronButterfly => "iron_butterfly",
            Self::IronCondor => "iron_condor",
            Self::Straddle => "straddle",
            Self::Strangle => "strangle",
            Self::PutCreditSpread => "put_credit_spread",
            Self::CallCreditSpread => "call_credit_spread",
        }
    }

    /// Whether the structure is opened for a net credit.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        !matches!(self, Self::Straddle | Self::Strangle)
    }

    /// Leg layout around `center` for a wing `distance` and short `offset`.
    #[must_use]
    pub fn legs(self, center: Decimal, distance: Decimal, offset: Decimal) -> Vec<LegTemplate> {
        use OptionAction::{Buy, Sell};
        use OptionRight::{Call, Put};

        match self {
            Self::IronButterfly => vec![
                LegTemplate::new(center - distance, Put, Buy),
                LegTemplate::new(center, Put, Sell),
                LegTemplate::new(center, Call, Sell),
                LegTemplate::new(center + distance, Call, Buy),
            ],
            Self::IronCondor => vec![
                LegTemplate::new(center - offset - distance, Put, Buy),
                LegTemplate::new(center - offset, Put, Sell),
                LegTemplate::new(center + offset, Call, Sell),
                LegTemplate::new(center + offset + distance, Call, Buy),
            ],
            Self::Straddle => vec![
                LegTemplate::new(center, Put, Buy),
                LegTemplate::new(center, Call, Buy),
            ],
            Self::Strangle => vec![
                LegTemplate::new(center - distance, Put, Buy),
                LegTemplate::new(center + distance, Call, Buy),
            ],
            Self::PutCreditSpread => vec![
                LegTemplate::new(center - offset - distance, Put, Buy),
                LegTemplate::new(center - offset, Put, Sell),
            ],
            Self::CallCreditSpread => vec![
                LegTemplate::new(center + offset, Call, Sell),
                LegTemplate::new(center + offset + distance, Call, Buy),
            ],
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
