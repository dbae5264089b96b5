//! Risk check result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Individual pre-trade checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCheck {
    /// Kill switch disengaged.
    KillSwitch,
    /// Inside the trading-hours window.
    TradingHours,
    /// Enough time left before the close.
    TimeToClose,
    /// Contracts in this trade.
    MaxContractsPerTrade,
    /// Contracts today including this trade.
    MaxContractsPerDay,
    /// Open positions including this trade.
    MaxOpenPositions,
    /// Minimum spacing since the last trade.
    TradeSpacing,
    /// Trades in the trailing hour.
    HourlyTradeLimit,
    /// Trades today.
    DailyTradeLimit,
    /// Estimated risk of this trade.
    MaxLossPerTrade,
    /// Realized loss today.
    DailyLossLimit,
    /// Previous sequence step already recorded.
    SequenceDependency,
    /// Structures of this kind today.
    StructureLimit,
    /// Volatility index ceiling.
    VixCeiling,
}

impl RiskCheck {
    /// Every check in evaluation order.
    pub const ALL: [Self; 14] = [
        Self::KillSwitch,
        Self::TradingHours,
        Self::TimeToClose,
        Self::MaxContractsPerTrade,
        Self::MaxContractsPerDay,
        Self::MaxOpenPositions,
        Self::TradeSpacing,
        Self::HourlyTradeLimit,
        Self::DailyTradeLimit,
        Self::MaxLossPerTrade,
        Self::DailyLossLimit,
        Self::SequenceDependency,
        Self::StructureLimit,
        Self::VixCeiling,
    ];

    /// Stable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::KillSwitch => "KILL_SWITCH",
            Self::TradingHours => "TRADING_HOURS",
            Self::TimeToClose => "TIME_TO_CLOSE",
            Self::MaxContractsPerTrade => "MAX_CONTRACTS_PER_TRADE",
            Self::MaxContractsPerDay => "MAX_CONTRACTS_PER_DAY",
            Self::MaxOpenPositions => "MAX_OPEN_POSITIONS",
            Self::TradeSpacing => "TRADE_SPACING",
            Self::HourlyTradeLimit => "HOURLY_TRADE_LIMIT",
            Self::DailyTradeLimit => "DAILY_TRADE_LIMIT",
            Self::MaxLossPerTrade => "MAX_LOSS_PER_TRADE",
            Self::DailyLossLimit => "DAILY_LOSS_LIMIT",
            Self::SequenceDependency => "SEQUENCE_DEPENDENCY",
            Self::StructureLimit => "STRUCTURE_LIMIT",
            Self::VixCeiling => "VIX_CEILING",
        }
    }
}

impl fmt::Display for RiskCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Which check.
    pub check: RiskCheck,
    /// Whether it passed.
    pub passed: bool,
    /// Observed value against the limit.
    pub message: String,
}

impl CheckResult {
    pub(super) fn new(check: RiskCheck, passed: bool, message: impl Into<String>) -> Self {
        Self {
            check,
            passed,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "PASS" } else { "BLOCKED" };
        write!(f, "[{verdict}] {}: {}", self.check, self.message)
    }
}

/// Outcome of every check for one candidate trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCheckReport {
    /// True iff every check passed.
    pub passed: bool,
    /// One result per check, in evaluation order.
    pub results: Vec<CheckResult>,
}

impl RiskCheckReport {
    pub(super) fn from_results(results: Vec<CheckResult>) -> Self {
        Self {
            passed: results.iter().all(|r| r.passed),
            results,
        }
    }

    /// Failed checks.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Human-readable reasons for every failed check.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.failures().map(ToString::to_string).collect()
    }

    /// Result of a specific check.
    #[must_use]
    pub fn result(&self, check: RiskCheck) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check == check)
    }
}
