//! Underlying instrument configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The single index the engine trades options on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingConfig {
    /// Index symbol for bars.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Symbol whose bar volume stands in for index volume.
    #[serde(default = "default_volume_proxy")]
    pub volume_proxy: String,
    /// Option root used in contract symbols.
    #[serde(default = "default_option_prefix")]
    pub option_prefix: String,
    /// Listed strike spacing.
    #[serde(default = "default_strike_increment")]
    pub strike_increment: Decimal,
    /// Contract multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
    /// Volatility index symbol for the VIX ceiling check.
    #[serde(default = "default_vix_symbol")]
    pub vix_symbol: Option<String>,
}

impl Default for UnderlyingConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            volume_proxy: default_volume_proxy(),
            option_prefix: default_option_prefix(),
            strike_increment: default_strike_increment(),
            multiplier: default_multiplier(),
            vix_symbol: default_vix_symbol(),
        }
    }
}

fn default_symbol() -> String {
    "SPX".to_string()
}

fn default_volume_proxy() -> String {
    "SPY".to_string()
}

fn default_option_prefix() -> String {
    "SPXW".to_string()
}

const fn default_strike_increment() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 0)
}

const fn default_multiplier() -> Decimal {
    Decimal::ONE_HUNDRED
}

#[allow(clippy::unnecessary_wraps)]
fn default_vix_symbol() -> Option<String> {
    Some("VIX".to_string())
}
