//! Per-day risk limits and counters.
//!
//! [`RiskLimitsManager`] owns today's [`RiskCounters`]. Only
//! [`record_trade`](RiskLimitsManager::record_trade) and
//! [`close_position`](RiskLimitsManager::close_position) change them. The
//! first access on a new calendar date resets every counter exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::kill_switch::{KillReason, KillSwitch, SYSTEM_ACTOR};
use super::risk_check::{CheckResult, RiskCheck, RiskCheckReport};
use crate::domain::shared::Clock;

/// Configured limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// First time of day new trades are allowed.
    #[serde(default = "default_trading_start")]
    pub trading_start: NaiveTime,
    /// Session close.
    #[serde(default = "default_trading_end")]
    pub trading_end: NaiveTime,
    /// No new trades this many minutes before the close.
    #[serde(default = "default_close_cutoff_minutes")]
    pub close_cutoff_minutes: i64,
    /// Contracts across all legs in one trade.
    #[serde(default = "default_max_contracts_per_trade")]
    pub max_contracts_per_trade: u32,
    /// Contracts across all trades today.
    #[serde(default = "default_max_contracts_per_day")]
    pub max_contracts_per_day: u32,
    /// Concurrently open positions.
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: u32,
    /// Minimum seconds between trades.
    #[serde(default = "default_min_seconds_between_trades")]
    pub min_seconds_between_trades: i64,
    /// Trades in any trailing hour.
    #[serde(default = "default_max_trades_per_hour")]
    pub max_trades_per_hour: u32,
    /// Trades today.
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,
    /// Largest estimated loss accepted for one trade.
    #[serde(default = "default_max_loss_per_trade")]
    pub max_loss_per_trade: Decimal,
    /// Realized loss today that halts trading.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Structures of one kind today.
    #[serde(default = "default_max_structures_per_kind")]
    pub max_structures_per_kind: u32,
    /// Optional volatility index ceiling.
    #[serde(default)]
    pub vix_ceiling: Option<f64>,
    /// Ordered step names. Step k needs step k-1 recorded today.
    #[serde(default)]
    pub sequence: Vec<String>,
}

fn default_trading_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn default_trading_end() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
}

const fn default_close_cutoff_minutes() -> i64 {
    15
}

const fn default_max_contracts_per_trade() -> u32 {
    40
}

const fn default_max_contracts_per_day() -> u32 {
    200
}

const fn default_max_open_positions() -> u32 {
    4
}

const fn default_min_seconds_between_trades() -> i64 {
    60
}

const fn default_max_trades_per_hour() -> u32 {
    4
}

const fn default_max_trades_per_day() -> u32 {
    10
}

const fn default_max_loss_per_trade() -> Decimal {
    Decimal::from_parts(5000, 0, 0, false, 0)
}

const fn default_max_daily_loss() -> Decimal {
    Decimal::from_parts(10_000, 0, 0, false, 0)
}

const fn default_max_structures_per_kind() -> u32 {
    2
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            trading_start: default_trading_start(),
            trading_end: default_trading_end(),
            close_cutoff_minutes: default_close_cutoff_minutes(),
            max_contracts_per_trade: default_max_contracts_per_trade(),
            max_contracts_per_day: default_max_contracts_per_day(),
            max_open_positions: default_max_open_positions(),
            min_seconds_between_trades: default_min_seconds_between_trades(),
            max_trades_per_hour: default_max_trades_per_hour(),
            max_trades_per_day: default_max_trades_per_day(),
            max_loss_per_trade: default_max_loss_per_trade(),
            max_daily_loss: default_max_daily_loss(),
            max_structures_per_kind: default_max_structures_per_kind(),
            vix_ceiling: None,
            sequence: Vec::new(),
        }
    }
}

impl RiskLimits {
    /// Validate limit consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.trading_start >= self.trading_end {
            return Err("trading_start must be before trading_end".to_string());
        }
        if self.close_cutoff_minutes < 0 || self.min_seconds_between_trades < 0 {
            return Err("close_cutoff_minutes and min_seconds_between_trades must be >= 0".to_string());
        }
        if self.max_contracts_per_trade > self.max_contracts_per_day {
            return Err("max_contracts_per_trade exceeds max_contracts_per_day".to_string());
        }
        if self.max_loss_per_trade <= Decimal::ZERO || self.max_daily_loss <= Decimal::ZERO {
            return Err("loss limits must be positive".to_string());
        }
        Ok(())
    }
}

/// Today's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounters {
    /// Date the counters belong to.
    pub day: NaiveDate,
    /// Contracts traded today.
    pub contracts_traded: u32,
    /// Trades today.
    pub trade_count: u32,
    /// Realized P&L from closed positions today.
    pub realized_pnl: Decimal,
    /// Step names recorded today.
    pub executed_steps: BTreeSet<String>,
    /// Trades per step name today.
    pub structure_counts: BTreeMap<String, u32>,
    /// Trade times today, oldest first.
    pub trade_times: Vec<NaiveDateTime>,
    /// Positions opened and not yet closed.
    pub open_positions: u32,
    /// Time of the last recorded trade.
    pub last_trade_time: Option<NaiveDateTime>,
    /// Date changes observed since construction.
    pub rollovers: u64,
}

impl RiskCounters {
    fn new(day: NaiveDate, rollovers: u64) -> Self {
        Self {
            day,
            contracts_traded: 0,
            trade_count: 0,
            realized_pnl: Decimal::ZERO,
            executed_steps: BTreeSet::new(),
            structure_counts: BTreeMap::new(),
            trade_times: Vec::new(),
            open_positions: 0,
            last_trade_time: None,
            rollovers,
        }
    }
}

/// How much of a position an exit closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionExit {
    /// Part of the position; it stays open.
    Partial,
    /// The last open contracts.
    Full,
}

/// Evaluates pre-trade limits and owns today's counters.
pub struct RiskLimitsManager {
    limits: RiskLimits,
    kill_switch: Arc<KillSwitch>,
    clock: Arc<dyn Clock>,
    counters: Mutex<RiskCounters>,
}

impl std::fmt::Debug for RiskLimitsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskLimitsManager")
            .field("limits", &self.limits)
            .field("counters", &*self.counters.lock())
            .finish_non_exhaustive()
    }
}

impl RiskLimitsManager {
    /// Create a manager with counters for today.
    #[must_use]
    pub fn new(limits: RiskLimits, kill_switch: Arc<KillSwitch>, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date();
        Self {
            limits,
            kill_switch,
            clock,
            counters: Mutex::new(RiskCounters::new(today, 0)),
        }
    }

    /// Configured limits.
    #[must_use]
    pub const fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Run every check for a candidate trade.
    ///
    /// All checks run, none short-circuits. A daily-loss breach also engages
    /// the kill switch so later trades stay blocked until an operator
    /// disengages it.
    pub fn check_all(
        &self,
        contracts: u32,
        estimated_risk: Decimal,
        structure_name: &str,
        vix: Option<f64>,
    ) -> RiskCheckReport {
        let now = self.clock.now();
        let mut counters = self.counters.lock();
        ensure_current_day(&mut counters, now.date());

        let limits = &self.limits;
        let time = now.time();
        let mut results = Vec::with_capacity(RiskCheck::ALL.len());

        let engaged = self.kill_switch.is_engaged();
        results.push(CheckResult::new(
            RiskCheck::KillSwitch,
            !engaged,
            if engaged {
                format!(
                    "kill switch engaged ({})",
                    self.kill_switch.reason().map_or_else(|| "unknown".to_string(), |r| r.to_string())
                )
            } else {
                "kill switch disengaged".to_string()
            },
        ));

        let in_hours = time >= limits.trading_start && time < limits.trading_end;
        results.push(CheckResult::new(
            RiskCheck::TradingHours,
            in_hours,
            format!("{time} within {}-{}", limits.trading_start, limits.trading_end),
        ));

        let minutes_left = (limits.trading_end - time).num_minutes();
        results.push(CheckResult::new(
            RiskCheck::TimeToClose,
            minutes_left >= limits.close_cutoff_minutes,
            format!("{minutes_left} min to close, cutoff {}", limits.close_cutoff_minutes),
        ));

        results.push(CheckResult::new(
            RiskCheck::MaxContractsPerTrade,
            contracts <= limits.max_contracts_per_trade,
            format!("{contracts} contracts, limit {}", limits.max_contracts_per_trade),
        ));

        let projected = counters.contracts_traded.checked_add(contracts);
        results.push(CheckResult::new(
            RiskCheck::MaxContractsPerDay,
            projected.is_some_and(|p| p <= limits.max_contracts_per_day),
            projected.map_or_else(
                || format!("{} + {contracts} contracts overflows", counters.contracts_traded),
                |p| format!("{p} contracts today, limit {}", limits.max_contracts_per_day),
            ),
        ));

        results.push(CheckResult::new(
            RiskCheck::MaxOpenPositions,
            counters.open_positions < limits.max_open_positions,
            format!("{} open, limit {}", counters.open_positions, limits.max_open_positions),
        ));

        let spacing = counters.last_trade_time.map(|last| (now - last).num_seconds());
        results.push(CheckResult::new(
            RiskCheck::TradeSpacing,
            spacing.is_none_or(|s| s >= limits.min_seconds_between_trades),
            spacing.map_or_else(
                || "no prior trade".to_string(),
                |s| format!("{s}s since last trade, minimum {}", limits.min_seconds_between_trades),
            ),
        ));

        let hour_ago = now - Duration::hours(1);
        let last_hour = counters.trade_times.iter().filter(|t| **t > hour_ago).count() as u32;
        results.push(CheckResult::new(
            RiskCheck::HourlyTradeLimit,
            last_hour < limits.max_trades_per_hour,
            format!("{last_hour} trades in last hour, limit {}", limits.max_trades_per_hour),
        ));

        results.push(CheckResult::new(
            RiskCheck::DailyTradeLimit,
            counters.trade_count < limits.max_trades_per_day,
            format!("{} trades today, limit {}", counters.trade_count, limits.max_trades_per_day),
        ));

        results.push(CheckResult::new(
            RiskCheck::MaxLossPerTrade,
            estimated_risk <= limits.max_loss_per_trade,
            format!("estimated risk {estimated_risk}, limit {}", limits.max_loss_per_trade),
        ));

        let loss_breached = counters.realized_pnl <= -limits.max_daily_loss;
        results.push(CheckResult::new(
            RiskCheck::DailyLossLimit,
            !loss_breached,
            format!("realized {} today, limit -{}", counters.realized_pnl, limits.max_daily_loss),
        ));

        results.push(sequence_check(limits, &counters, structure_name));

        let kind_count = counters.structure_counts.get(structure_name).copied().unwrap_or(0);
        results.push(CheckResult::new(
            RiskCheck::StructureLimit,
            kind_count < limits.max_structures_per_kind,
            format!("{kind_count} {structure_name} today, limit {}", limits.max_structures_per_kind),
        ));

        results.push(vix_check(limits.vix_ceiling, vix));

        let realized = counters.realized_pnl;
        drop(counters);

        if loss_breached {
            self.kill_switch.engage(
                KillReason::DailyLossLimit,
                format!("realized {realized} breached -{}", limits.max_daily_loss),
                SYSTEM_ACTOR,
            );
        }

        let report = RiskCheckReport::from_results(results);
        if !report.passed {
            tracing::warn!(
                structure = %structure_name,
                contracts,
                estimated_risk = %estimated_risk,
                blocked = ?report.failures().map(|r| r.check.code()).collect::<Vec<_>>(),
                "Risk check blocked trade"
            );
        }
        report
    }

    /// Record an executed trade.
    pub fn record_trade(&self, structure_name: &str, contracts: u32) {
        let now = self.clock.now();
        let mut counters = self.counters.lock();
        ensure_current_day(&mut counters, now.date());

        counters.contracts_traded = counters.contracts_traded.saturating_add(contracts);
        counters.trade_count = counters.trade_count.saturating_add(1);
        counters.executed_steps.insert(structure_name.to_string());
        *counters
            .structure_counts
            .entry(structure_name.to_string())
            .or_insert(0) += 1;
        counters.trade_times.push(now);
        counters.open_positions += 1;
        counters.last_trade_time = Some(now);

        tracing::info!(
            structure = %structure_name,
            contracts,
            trades_today = counters.trade_count,
            "Trade recorded"
        );
    }

    /// Record realized P&L from an exit.
    ///
    /// `realized_pnl` is the amount not reported before for this position.
    /// Only a [`PositionExit::Full`] exit frees an open-position slot.
    pub fn close_position(&self, realized_pnl: Decimal, exit: PositionExit) {
        let now = self.clock.now();
        let mut counters = self.counters.lock();
        ensure_current_day(&mut counters, now.date());

        if exit == PositionExit::Full {
            counters.open_positions = counters.open_positions.saturating_sub(1);
        }
        counters.realized_pnl += realized_pnl;

        tracing::info!(
            realized_pnl = %realized_pnl,
            exit = ?exit,
            realized_today = %counters.realized_pnl,
            open_positions = counters.open_positions,
            "Position exit recorded"
        );
    }

    /// Copy of today's counters.
    #[must_use]
    pub fn snapshot(&self) -> RiskCounters {
        let mut counters = self.counters.lock();
        ensure_current_day(&mut counters, self.clock.now().date());
        counters.clone()
    }
}

fn ensure_current_day(counters: &mut RiskCounters, today: NaiveDate) {
    if counters.day != today {
        let rollovers = counters.rollovers + 1;
        tracing::info!(from = %counters.day, to = %today, "Risk counters reset for new trading day");
        *counters = RiskCounters::new(today, rollovers);
    }
}

fn sequence_check(limits: &RiskLimits, counters: &RiskCounters, structure_name: &str) -> CheckResult {
    let position = limits.sequence.iter().position(|s| s == structure_name);
    match position {
        Some(i) if i > 0 => {
            let previous = &limits.sequence[i - 1];
            CheckResult::new(
                RiskCheck::SequenceDependency,
                counters.executed_steps.contains(previous),
                format!("{structure_name} requires {previous}"),
            )
        }
        _ => CheckResult::new(RiskCheck::SequenceDependency, true, "no prerequisite"),
    }
}

fn vix_check(ceiling: Option<f64>, vix: Option<f64>) -> CheckResult {
    match (ceiling, vix) {
        (None, _) => CheckResult::new(RiskCheck::VixCeiling, true, "no ceiling"),
        (Some(c), Some(v)) => CheckResult::new(RiskCheck::VixCeiling, v <= c, format!("VIX {v:.2}, ceiling {c:.2}")),
        (Some(c), None) => CheckResult::new(RiskCheck::VixCeiling, false, format!("VIX unavailable, ceiling {c:.2}")),
    }
}
