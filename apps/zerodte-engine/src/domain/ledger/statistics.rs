//! Performance statistics over closed ledger trades.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ledger_trade::LedgerTrade;
use super::position_ledger::{DailyPnl, EquityPoint};
use crate::domain::shared::math::{mean, sqrt_decimal, std_dev};
use crate::domain::trade::StructureKind;

/// Trading days per year for annualization.
const TRADING_DAYS_PER_YEAR: u64 = 252;

/// Breakdown for one structure kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStats {
    /// Closed trades.
    pub trades: usize,
    /// Trades with positive P&L.
    pub wins: usize,
    /// Trades with negative P&L.
    pub losses: usize,
    /// Net P&L.
    pub total_pnl: Decimal,
    /// `wins / trades`.
    pub win_rate: Option<Decimal>,
    /// Mean P&L per trade.
    pub avg_pnl: Option<Decimal>,
}

/// Aggregate performance over a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    /// Closed trades counted.
    pub total_trades: usize,
    /// Closed trades with positive P&L.
    pub winning_trades: usize,
    /// Closed trades with negative P&L.
    pub losing_trades: usize,
    /// `winning_trades / total_trades`.
    pub win_rate: Option<Decimal>,
    /// Sum of winning P&L.
    pub gross_profit: Decimal,
    /// Sum of losing P&L, as a positive number.
    pub gross_loss: Decimal,
    /// `gross_profit / gross_loss`, `None` without losses.
    pub profit_factor: Option<Decimal>,
    /// Net realized P&L over all trades, open ones included.
    pub total_pnl: Decimal,
    /// Commissions paid.
    pub total_commissions: Decimal,
    /// Largest peak-to-trough equity decline.
    pub max_drawdown: Decimal,
    /// `max_drawdown / peak` at the deepest point.
    pub max_drawdown_pct: Option<Decimal>,
    /// Annualized mean over standard deviation of daily P&L.
    pub sharpe_ratio: Option<Decimal>,
    /// Per-structure breakdown.
    pub by_structure: BTreeMap<StructureKind, StructureStats>,
}

impl LedgerStatistics {
    /// Compute statistics from ledger state.
    #[must_use]
    pub fn compute(
        trades: &[LedgerTrade],
        equity_curve: &[EquityPoint],
        daily: &[DailyPnl],
        starting_capital: Decimal,
    ) -> Self {
        let closed: Vec<&LedgerTrade> = trades.iter().filter(|t| !t.is_open()).collect();

        let mut winning_trades = 0;
        let mut losing_trades = 0;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut by_structure: BTreeMap<StructureKind, StructureStats> = BTreeMap::new();

        for trade in &closed {
            let pnl = trade.realized_pnl();
            let entry = by_structure.entry(trade.kind).or_insert_with(|| StructureStats {
                trades: 0,
                wins: 0,
                losses: 0,
                total_pnl: Decimal::ZERO,
                win_rate: None,
                avg_pnl: None,
            });
            entry.trades += 1;
            entry.total_pnl += pnl;

            if pnl > Decimal::ZERO {
                winning_trades += 1;
                gross_profit += pnl;
                entry.wins += 1;
            } else if pnl < Decimal::ZERO {
                losing_trades += 1;
                gross_loss += -pnl;
                entry.losses += 1;
            }
        }

        for stats in by_structure.values_mut() {
            let n = Decimal::from(stats.trades as u64);
            stats.win_rate = Some(Decimal::from(stats.wins as u64) / n);
            stats.avg_pnl = Some(stats.total_pnl / n);
        }

        let total_trades = closed.len();
        let win_rate =
            (total_trades > 0).then(|| Decimal::from(winning_trades as u64) / Decimal::from(total_trades as u64));
        let profit_factor = (gross_loss > Decimal::ZERO).then(|| gross_profit / gross_loss);

        let (max_drawdown, max_drawdown_pct) = max_drawdown(starting_capital, equity_curve);
        let daily_values: Vec<Decimal> = daily.iter().map(|d| d.pnl).collect();

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            gross_profit,
            gross_loss,
            profit_factor,
            total_pnl: trades.iter().map(LedgerTrade::realized_pnl).sum(),
            total_commissions: trades.iter().map(|t| t.commissions).sum(),
            max_drawdown,
            max_drawdown_pct,
            sharpe_ratio: sharpe_ratio(&daily_values),
            by_structure,
        }
    }
}

/// Peak-to-trough decline over the equity curve, starting from capital.
fn max_drawdown(starting_capital: Decimal, curve: &[EquityPoint]) -> (Decimal, Option<Decimal>) {
    let mut peak = starting_capital;
    let mut worst = Decimal::ZERO;
    let mut worst_pct = None;

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = peak - point.equity;
        if drawdown > worst {
            worst = drawdown;
            worst_pct = (peak > Decimal::ZERO).then(|| drawdown / peak);
        }
    }

    (worst, worst_pct)
}

/// Annualized daily Sharpe with a zero risk-free rate.
fn sharpe_ratio(daily: &[Decimal]) -> Option<Decimal> {
    let avg = mean(daily)?;
    let sd = std_dev(daily)?;
    if sd.is_zero() {
        return None;
    }
    let annualization = sqrt_decimal(Decimal::from(TRADING_DAYS_PER_YEAR))?;
    Some(avg / sd * annualization)
}
