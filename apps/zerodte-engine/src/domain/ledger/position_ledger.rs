//! Position ledger: trade lifecycle, equity curve and daily P&L.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commission::CommissionModel;
use super::errors::LedgerError;
use super::ledger_trade::{ExitKind, LedgerTrade, TradeRecord};
use super::statistics::LedgerStatistics;
use crate::domain::trade::TradeDescriptor;

/// Contracts closed when exiting `fraction` of `remaining`: floored, at least
/// one, never more than `remaining`.
#[must_use]
pub fn exit_size(remaining: u32, fraction: Decimal) -> u32 {
    if remaining == 0 {
        return 0;
    }
    (Decimal::from(remaining) * fraction)
        .floor()
        .to_u32()
        .unwrap_or(remaining)
        .clamp(1, remaining)
}

/// Account equity after a realized P&L change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Event time.
    pub at: NaiveDateTime,
    /// Starting capital plus realized P&L.
    pub equity: Decimal,
}

/// Realized P&L for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPnl {
    /// Trading date.
    pub date: NaiveDate,
    /// Net realized P&L, commissions included.
    pub pnl: Decimal,
    /// Trades that went flat on this date.
    pub trades_closed: u32,
}

/// Records every trade from entry to close.
///
/// Trades stay OPEN until every leg is flat, either by settlement or by
/// offsetting exits. Realized P&L flows into the equity curve and the daily
/// P&L map as it happens; neither is ever rewritten.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    starting_capital: Decimal,
    commission: CommissionModel,
    trades: Vec<LedgerTrade>,
    index: HashMap<Uuid, usize>,
    realized: Decimal,
    equity_curve: Vec<EquityPoint>,
    daily: BTreeMap<NaiveDate, DailyPnl>,
}

impl PositionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new(starting_capital: Decimal, commission: CommissionModel) -> Self {
        Self {
            starting_capital,
            commission,
            trades: Vec::new(),
            index: HashMap::new(),
            realized: Decimal::ZERO,
            equity_curve: Vec::new(),
            daily: BTreeMap::new(),
        }
    }

    /// Open a trade from a filled descriptor. Entry commission is charged now.
    pub fn open_trade(&mut self, descriptor: &TradeDescriptor, step: &str, at: NaiveDateTime) -> Uuid {
        let commission = self.commission.charge(descriptor.total_contracts());
        let trade = LedgerTrade::open(descriptor, step, at, commission);
        let id = trade.id;

        tracing::debug!(
            trade_id = %id,
            step,
            structure = %trade.kind,
            strikes = %descriptor.strikes_repr(),
            premium = %trade.entry_premium,
            "Ledger trade opened"
        );

        self.index.insert(id, self.trades.len());
        self.trades.push(trade);
        self.book(at, -commission, false);
        id
    }

    /// Close `fraction` of one leg's remaining contracts at `price`.
    ///
    /// The contract count is floored with a minimum of one. Returns the net
    /// P&L of the fill.
    pub fn partial_exit(
        &mut self,
        id: Uuid,
        symbol: &str,
        fraction: Decimal,
        price: Decimal,
        at: NaiveDateTime,
    ) -> Result<Decimal, LedgerError> {
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(LedgerError::InvalidFraction(fraction.to_string()));
        }

        let slot = self.open_slot(id)?;
        let trade = &mut self.trades[slot];
        let leg_index = trade
            .legs
            .iter()
            .position(|l| l.contract.symbol() == symbol)
            .ok_or_else(|| LedgerError::LegNotFound {
                id,
                symbol: symbol.to_string(),
            })?;

        let remaining = trade.legs[leg_index].remaining;
        if remaining == 0 {
            return Ok(Decimal::ZERO);
        }
        let contracts = exit_size(remaining, fraction);

        let commission = self.commission.charge(contracts);
        let gross = trade.exit_leg(leg_index, contracts, price, commission, ExitKind::Partial, at);
        let closed = !trade.is_open();

        tracing::info!(trade_id = %id, symbol, contracts, price = %price, pnl = %gross, "Partial exit");

        let net = gross - commission;
        self.book(at, net, closed);
        Ok(net)
    }

    /// Close every remaining leg at the given prices.
    ///
    /// Fails without touching the trade when a price is missing.
    pub fn close_trade(
        &mut self,
        id: Uuid,
        prices: &HashMap<String, Decimal>,
        at: NaiveDateTime,
    ) -> Result<Decimal, LedgerError> {
        let slot = self.open_slot(id)?;
        let trade = &mut self.trades[slot];

        if let Some(missing) = trade
            .legs
            .iter()
            .filter(|l| l.remaining > 0)
            .find(|l| !prices.contains_key(l.contract.symbol()))
        {
            return Err(LedgerError::MissingPrice {
                symbol: missing.contract.symbol().to_string(),
            });
        }

        let mut net = Decimal::ZERO;
        for i in 0..trade.legs.len() {
            let leg = &trade.legs[i];
            if leg.remaining == 0 {
                continue;
            }
            let contracts = leg.remaining;
            let price = prices.get(leg.contract.symbol()).copied().unwrap_or_default();
            let commission = self.commission.charge(contracts);
            net += trade.exit_leg(i, contracts, price, commission, ExitKind::Close, at) - commission;
        }

        tracing::info!(trade_id = %id, pnl = %trade.realized_pnl(), "Ledger trade closed");
        self.book(at, net, true);
        Ok(net)
    }

    /// Cash-settle every remaining leg at intrinsic value. Settlement is free.
    pub fn settle_trade(&mut self, id: Uuid, underlying_close: Decimal, at: NaiveDateTime) -> Result<Decimal, LedgerError> {
        let slot = self.open_slot(id)?;
        let trade = &mut self.trades[slot];

        let mut net = Decimal::ZERO;
        for i in 0..trade.legs.len() {
            let leg = &trade.legs[i];
            if leg.remaining == 0 {
                continue;
            }
            let contracts = leg.remaining;
            let value = leg.contract.intrinsic_value(underlying_close);
            net += trade.exit_leg(i, contracts, value, Decimal::ZERO, ExitKind::Settlement, at);
        }

        tracing::info!(
            trade_id = %id,
            underlying_close = %underlying_close,
            pnl = %trade.realized_pnl(),
            "Ledger trade settled"
        );
        self.book(at, net, true);
        Ok(net)
    }

    /// Settle every open trade. Returns `(id, settlement P&L)` per trade.
    pub fn settle_all_open(&mut self, underlying_close: Decimal, at: NaiveDateTime) -> Vec<(Uuid, Decimal)> {
        let open: Vec<Uuid> = self.open_trades().map(|t| t.id).collect();
        open.into_iter()
            .filter_map(|id| self.settle_trade(id, underlying_close, at).ok().map(|pnl| (id, pnl)))
            .collect()
    }

    /// Trade by id.
    #[must_use]
    pub fn trade(&self, id: Uuid) -> Option<&LedgerTrade> {
        self.index.get(&id).map(|&i| &self.trades[i])
    }

    /// All trades in entry order.
    #[must_use]
    pub fn trades(&self) -> &[LedgerTrade] {
        &self.trades
    }

    /// Open trades.
    pub fn open_trades(&self) -> impl Iterator<Item = &LedgerTrade> {
        self.trades.iter().filter(|t| t.is_open())
    }

    /// Number of open trades.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open_trades().count()
    }

    /// Starting capital.
    #[must_use]
    pub const fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    /// Net realized P&L.
    #[must_use]
    pub const fn realized_pnl(&self) -> Decimal {
        self.realized
    }

    /// Current equity.
    #[must_use]
    pub fn equity(&self) -> Decimal {
        self.starting_capital + self.realized
    }

    /// Equity curve.
    #[must_use]
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Daily P&L in date order.
    #[must_use]
    pub fn daily_pnl(&self) -> Vec<DailyPnl> {
        self.daily.values().copied().collect()
    }

    /// Export records in entry order.
    #[must_use]
    pub fn records(&self) -> Vec<TradeRecord> {
        self.trades.iter().map(LedgerTrade::to_record).collect()
    }

    /// Performance statistics.
    #[must_use]
    pub fn statistics(&self) -> LedgerStatistics {
        LedgerStatistics::compute(&self.trades, &self.equity_curve, &self.daily_pnl(), self.starting_capital)
    }

    fn open_slot(&self, id: Uuid) -> Result<usize, LedgerError> {
        let slot = *self.index.get(&id).ok_or(LedgerError::TradeNotFound { id })?;
        if !self.trades[slot].is_open() {
            return Err(LedgerError::TradeClosed { id });
        }
        Ok(slot)
    }

    fn book(&mut self, at: NaiveDateTime, pnl: Decimal, closed_trade: bool) {
        self.realized += pnl;
        self.equity_curve.push(EquityPoint {
            at,
            equity: self.equity(),
        });

        let date = at.date();
        let day = self.daily.entry(date).or_insert(DailyPnl {
            date,
            pnl: Decimal::ZERO,
            trades_closed: 0,
        });
        day.pnl += pnl;
        if closed_trade {
            day.trades_closed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::TradeStatus;
    use crate::domain::market_data::{OptionAction, OptionContract, OptionRight};
    use crate::domain::strike_selection::StrikeResult;
    use crate::domain::trade::{OptionLeg, StructureKind, TradeBuilder};
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn leg(strike: Decimal, right: OptionRight, action: OptionAction, bid: Decimal, ask: Decimal) -> OptionLeg {
        OptionLeg::new(OptionContract::new("SPXW", day(), right, strike), action, 1, bid, ask)
    }

    /// 5950/6000P 6000/6050C fly, 30.00 credit.
    fn fly(quantity: u32) -> TradeDescriptor {
        let result = StrikeResult {
            center_strike: dec!(6000),
            distance: dec!(50),
            net_credit: dec!(30.00),
            max_loss: dec!(20.00),
            ratio: dec!(1.5),
            legs: vec![
                leg(dec!(5950), OptionRight::Put, OptionAction::Buy, dec!(2.90), dec!(3.10)),
                leg(dec!(6000), OptionRight::Put, OptionAction::Sell, dec!(17.80), dec!(18.20)),
                leg(dec!(6000), OptionRight::Call, OptionAction::Sell, dec!(17.90), dec!(18.10)),
                leg(dec!(6050), OptionRight::Call, OptionAction::Buy, dec!(2.40), dec!(2.60)),
            ],
        };
        TradeBuilder::new(StructureKind::IronButterfly, dec!(100), dec!(6001), at(10, 0)).build(&result, quantity)
    }

    fn strangle() -> TradeDescriptor {
        let legs = vec![
            leg(dec!(5990), OptionRight::Put, OptionAction::Buy, dec!(4.00), dec!(4.20)),
            leg(dec!(6010), OptionRight::Call, OptionAction::Buy, dec!(3.80), dec!(4.00)),
        ];
        TradeBuilder::new(StructureKind::Strangle, dec!(100), dec!(6000), at(10, 30)).build_debit(&legs, dec!(10), 10)
    }

    #[test]
    fn iron_butterfly_settles_at_intrinsic() {
        let commission = CommissionModel::default();
        let mut ledger = PositionLedger::new(dec!(100_000), commission);
        let descriptor = fly(1);
        let id = ledger.open_trade(&descriptor, "iron_butterfly", at(10, 0));

        ledger.settle_trade(id, dec!(6010), at(16, 0)).unwrap();

        let trade = ledger.trade(id).unwrap();
        let expected = descriptor.net_premium() * dec!(100) - dec!(1000) - commission.charge(4);
        assert_eq!(trade.realized_pnl(), expected);
        assert_eq!(trade.realized_pnl(), dec!(1997.40));
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.exit_time, Some(at(16, 0)));
        assert_eq!(ledger.equity(), dec!(101_997.40));
    }

    #[test]
    fn partial_exit_floors_with_minimum_one() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = ledger.open_trade(&strangle(), "hedge", at(10, 30));
        let put = ledger.trade(id).unwrap().legs[0].contract.symbol().to_string();

        // floor(10 * 0.25) = 2
        let pnl = ledger.partial_exit(id, &put, dec!(0.25), dec!(9.20), at(11, 0)).unwrap();
        assert_eq!(pnl, dec!(1000));
        assert_eq!(ledger.trade(id).unwrap().legs[0].remaining, 8);

        // floor(8 * 0.1) = 0 -> 1
        ledger.partial_exit(id, &put, dec!(0.1), dec!(9.20), at(11, 5)).unwrap();
        assert_eq!(ledger.trade(id).unwrap().legs[0].remaining, 7);
        assert!(ledger.trade(id).unwrap().is_open());
    }

    #[test]
    fn trade_closes_when_all_legs_exit() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = ledger.open_trade(&strangle(), "hedge", at(10, 30));
        let symbols: Vec<String> = ledger
            .trade(id)
            .unwrap()
            .legs
            .iter()
            .map(|l| l.contract.symbol().to_string())
            .collect();

        for symbol in &symbols {
            ledger.partial_exit(id, symbol, dec!(1), dec!(1.00), at(12, 0)).unwrap();
        }

        let trade = ledger.trade(id).unwrap();
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.open_contracts(), 0);
        assert!(matches!(
            ledger.partial_exit(id, &symbols[0], dec!(1), dec!(1.00), at(12, 1)),
            Err(LedgerError::TradeClosed { .. })
        ));
        assert_eq!(ledger.daily_pnl()[0].trades_closed, 1);
    }

    #[test]
    fn partial_exit_rejects_bad_input() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = ledger.open_trade(&strangle(), "hedge", at(10, 30));

        assert!(matches!(
            ledger.partial_exit(id, "NOPE", dec!(0.5), dec!(1), at(11, 0)),
            Err(LedgerError::LegNotFound { .. })
        ));
        assert!(matches!(
            ledger.partial_exit(id, "NOPE", dec!(1.5), dec!(1), at(11, 0)),
            Err(LedgerError::InvalidFraction(_))
        ));
        assert!(matches!(
            ledger.partial_exit(Uuid::new_v4(), "NOPE", dec!(0.5), dec!(1), at(11, 0)),
            Err(LedgerError::TradeNotFound { .. })
        ));
    }

    #[test]
    fn close_trade_requires_every_price() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::default());
        let descriptor = fly(1);
        let id = ledger.open_trade(&descriptor, "iron_butterfly", at(10, 0));

        let mut prices: HashMap<String, Decimal> = descriptor
            .legs()
            .iter()
            .map(|l| (l.symbol().to_string(), l.mid()))
            .collect();
        let first = descriptor.legs()[0].symbol().to_string();
        prices.remove(&first);

        assert!(matches!(
            ledger.close_trade(id, &prices, at(11, 0)),
            Err(LedgerError::MissingPrice { .. })
        ));
        assert!(ledger.trade(id).unwrap().is_open());

        prices.insert(first, dec!(3.00));
        ledger.close_trade(id, &prices, at(11, 0)).unwrap();
        let trade = ledger.trade(id).unwrap();
        assert!(!trade.is_open());
        assert_eq!(trade.commissions, dec!(5.20));
    }

    #[test]
    fn settle_all_open_skips_closed_trades() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let a = ledger.open_trade(&fly(1), "iron_butterfly", at(10, 0));
        let b = ledger.open_trade(&fly(2), "iron_butterfly", at(10, 5));
        ledger.settle_trade(a, dec!(6000), at(15, 0)).unwrap();

        let settled = ledger.settle_all_open(dec!(6000), at(16, 0));
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].0, b);
        assert_eq!(ledger.open_count(), 0);
    }

    #[test]
    fn statistics_break_down_by_structure() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let win = ledger.open_trade(&fly(1), "iron_butterfly", at(10, 0));
        ledger.settle_trade(win, dec!(6000), at(16, 0)).unwrap();
        let loss = ledger.open_trade(&fly(1), "iron_butterfly", at(10, 0));
        ledger.settle_trade(loss, dec!(6100), at(16, 0)).unwrap();
        let hedge = ledger.open_trade(&strangle(), "hedge", at(10, 30));
        ledger.settle_trade(hedge, dec!(6000), at(16, 0)).unwrap();

        let stats = ledger.statistics();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 2);
        // +3000, -2000, -8200
        assert_eq!(stats.total_pnl, dec!(-7200));
        assert_eq!(stats.gross_profit, dec!(3000));
        assert_eq!(stats.gross_loss, dec!(10200));

        let fly_stats = &stats.by_structure[&StructureKind::IronButterfly];
        assert_eq!(fly_stats.trades, 2);
        assert_eq!(fly_stats.win_rate, Some(dec!(0.5)));
        assert_eq!(stats.by_structure[&StructureKind::Strangle].losses, 1);
    }

    #[test]
    fn records_carry_metadata() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::default());
        let id = ledger.open_trade(&fly(2), "iron_butterfly", at(10, 0));
        let record = &ledger.records()[0];

        assert_eq!(record.id, id);
        assert_eq!(record.size, 2);
        assert_eq!(record.status, TradeStatus::Open);
        assert_eq!(record.legs.len(), 4);
        assert_eq!(record.legs["SPXW251017P05950000"].contracts, 2);
        assert_eq!(record.metadata["strikes"], "5950/6000P 6000/6050C");
        assert_eq!(record.metadata["step"], "iron_butterfly");
        assert_eq!(record.realized_pnl, dec!(-5.20));
    }
}
