//! Commission model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat per-contract commission, charged on entry and on every exit fill.
/// Cash settlement at expiry is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionModel {
    /// Commission per option contract.
    #[serde(default = "default_option_per_contract")]
    pub option_per_contract: Decimal,
}

const fn default_option_per_contract() -> Decimal {
    Decimal::from_parts(65, 0, 0, false, 2)
}

impl Default for CommissionModel {
    fn default() -> Self {
        Self {
            option_per_contract: default_option_per_contract(),
        }
    }
}

impl CommissionModel {
    /// Free trading.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            option_per_contract: Decimal::ZERO,
        }
    }

    /// Commission for `contracts` contracts.
    #[must_use]
    pub fn charge(&self, contracts: u32) -> Decimal {
        self.option_per_contract * Decimal::from(contracts)
    }
}
