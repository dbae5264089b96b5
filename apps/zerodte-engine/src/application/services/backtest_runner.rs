//! Offline replay of the strategy sequence over historical days.
//!
//! Every bar of every trading day in the range runs in order. Past the
//! warm-up window each still-unresolved step gets one pipeline evaluation
//! per bar. Open hedges are checked for partial exits every bar, and every
//! OPEN trade settles at intrinsic value from the last underlying close.
//! Guardrails do not run here.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::hedge::HedgeMonitor;
use super::pipeline::{SessionData, TradePipeline};
use super::sequence::SequenceState;
use crate::config::StrategyConfig;
use crate::domain::ledger::{CommissionModel, DailyPnl, EquityPoint, LedgerStatistics, PositionLedger, TradeRecord};
use crate::domain::session::{SessionHours, TradingCalendar};

/// A day the replay could not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDay {
    /// Date.
    pub date: NaiveDate,
    /// Why.
    pub reason: String,
}

/// Backtest output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// First date requested.
    pub start: NaiveDate,
    /// Last date requested.
    pub end: NaiveDate,
    /// Trading days replayed.
    pub days_run: usize,
    /// Trading days without data.
    pub days_skipped: Vec<SkippedDay>,
    /// Every trade.
    pub trades: Vec<TradeRecord>,
    /// Realized P&L per day.
    pub daily_pnl: Vec<DailyPnl>,
    /// Equity after each realized change.
    pub equity_curve: Vec<EquityPoint>,
    /// Performance summary.
    pub statistics: LedgerStatistics,
    /// Equity at the end.
    pub final_equity: Decimal,
}

/// Replays the sequence over a date range.
#[derive(Debug)]
pub struct BacktestRunner {
    pipeline: TradePipeline,
    strategies: Vec<StrategyConfig>,
    sequence_dependent: bool,
    calendar: TradingCalendar,
    hours: SessionHours,
    ledger: PositionLedger,
    hedges: HedgeMonitor,
}

impl BacktestRunner {
    /// Create a runner with an empty ledger.
    #[must_use]
    pub fn new(
        pipeline: TradePipeline,
        strategies: Vec<StrategyConfig>,
        sequence_dependent: bool,
        calendar: TradingCalendar,
        hours: SessionHours,
        starting_capital: Decimal,
        commission: CommissionModel,
    ) -> Self {
        Self {
            pipeline,
            strategies,
            sequence_dependent,
            calendar,
            hours,
            ledger: PositionLedger::new(starting_capital, commission),
            hedges: HedgeMonitor::new(),
        }
    }

    /// Replay every trading day in `[start, end]`.
    pub async fn run(mut self, start: NaiveDate, end: NaiveDate) -> BacktestReport {
        let steps = self.strategies.iter().map(|s| s.name.clone()).collect();
        let mut sequence = SequenceState::new(steps, self.sequence_dependent);
        let mut days_run = 0;
        let mut days_skipped = Vec::new();

        tracing::info!(start = %start, end = %end, steps = self.strategies.len(), "Backtest started");

        for date in self.calendar.trading_days(start, end) {
            let session = match self.pipeline.load_session(date).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(date = %date, error = %e, "Skipping day without data");
                    days_skipped.push(SkippedDay {
                        date,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            sequence.reset_for(date);
            self.run_day(&session, &mut sequence).await;
            days_run += 1;
        }

        let statistics = self.ledger.statistics();
        tracing::info!(
            days_run,
            trades = statistics.total_trades,
            total_pnl = %statistics.total_pnl,
            win_rate = ?statistics.win_rate,
            "Backtest finished"
        );

        BacktestReport {
            start,
            end,
            days_run,
            days_skipped,
            trades: self.ledger.records(),
            daily_pnl: self.ledger.daily_pnl(),
            equity_curve: self.ledger.equity_curve().to_vec(),
            statistics,
            final_equity: self.ledger.equity(),
        }
    }

    async fn run_day(&mut self, session: &SessionData, sequence: &mut SequenceState) {
        for index in 0..session.len() {
            let at = session.bars[index].timestamp;
            if !self.hours.contains(at) {
                continue;
            }

            if !self.hedges.is_empty() {
                self.check_hedges(at).await;
            }

            let eligible: Vec<String> = sequence.eligible().into_iter().map(str::to_string).collect();
            for name in eligible {
                let Some(step) = self.strategies.iter().find(|s| s.name == name) else {
                    continue;
                };
                if index < step.signal.warmup_bars() {
                    continue;
                }
                let Some(intent) = self.pipeline.evaluate_tick(step, session, index).await else {
                    continue;
                };

                let id = self.ledger.open_trade(&intent.descriptor, &step.name, at);
                if let Some(rule) = step.hedge_exit {
                    self.hedges.watch(id, rule);
                }
                sequence.mark_executed(&name);
            }
        }

        if let Some(last) = session.last_bar() {
            let close_at = self.hours.close_at(last.timestamp).max(last.timestamp);
            for (id, pnl) in self.ledger.settle_all_open(last.close, close_at) {
                tracing::debug!(trade_id = %id, pnl = %pnl, underlying_close = %last.close, "Settled at close");
            }
            self.hedges.prune(&self.ledger);
        }
    }

    async fn check_hedges(&mut self, at: NaiveDateTime) {
        let symbols = self.hedges.symbols(&self.ledger);
        if symbols.is_empty() {
            return;
        }
        let board = self.pipeline.fetch_board(&symbols, at).await;
        for exit in self.hedges.due_exits(&self.ledger, &board) {
            match self.ledger.partial_exit(exit.trade_id, &exit.symbol, exit.fraction, exit.price, at) {
                Ok(pnl) => {
                    tracing::info!(trade_id = %exit.trade_id, symbol = %exit.symbol, pnl = %pnl, "Hedge partial exit");
                    self.hedges.complete(&exit);
                }
                Err(e) => tracing::warn!(trade_id = %exit.trade_id, error = %e, "Hedge exit failed"),
            }
        }
    }
}
