//! Backtest configuration.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ledger::CommissionModel;

/// Offline replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// JSON market data file.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// First date replayed. Defaults to the first date in the data.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last date replayed. Defaults to the last date in the data.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Account equity before the first trade.
    #[serde(default = "default_starting_capital")]
    pub starting_capital: Decimal,
    /// Commission schedule.
    #[serde(default)]
    pub commission: CommissionModel,
    /// Optional JSON report output.
    #[serde(default)]
    pub report_path: Option<String>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            start_date: None,
            end_date: None,
            starting_capital: default_starting_capital(),
            commission: CommissionModel::default(),
            report_path: None,
        }
    }
}

fn default_data_path() -> String {
    "data/session.json".to_string()
}

const fn default_starting_capital() -> Decimal {
    Decimal::from_parts(100_000, 0, 0, false, 0)
}
