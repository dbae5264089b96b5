//! Partial profit taking on long hedge legs.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::HedgeExitConfig;
use crate::domain::ledger::{PositionLedger, exit_size};
use crate::domain::market_data::OptionAction;
use crate::domain::strike_selection::QuoteBoard;

/// A leg that reached its profit multiple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedgeExit {
    /// Ledger trade id.
    pub trade_id: Uuid,
    /// Leg symbol.
    pub symbol: String,
    /// Share of remaining contracts to close.
    pub fraction: Decimal,
    /// Contracts that share amounts to.
    pub contracts: u32,
    /// Exit price (the bid).
    pub price: Decimal,
}

#[derive(Debug, Clone)]
struct Watched {
    rule: HedgeExitConfig,
    done: HashSet<String>,
}

/// Watches open hedge trades. Each long leg exits partially at most once.
#[derive(Debug, Clone, Default)]
pub struct HedgeMonitor {
    watched: HashMap<Uuid, Watched>,
}

impl HedgeMonitor {
    /// Empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching a ledger trade.
    pub fn watch(&mut self, trade_id: Uuid, rule: HedgeExitConfig) {
        self.watched.insert(
            trade_id,
            Watched {
                rule,
                done: HashSet::new(),
            },
        );
    }

    /// Whether nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Stop watching trades that are no longer open.
    pub fn prune(&mut self, ledger: &PositionLedger) {
        self.watched.retain(|id, _| ledger.trade(*id).is_some_and(|t| t.is_open()));
    }

    /// Symbols that need quotes for [`Self::due_exits`].
    #[must_use]
    pub fn symbols(&self, ledger: &PositionLedger) -> Vec<String> {
        let mut out = Vec::new();
        for (id, watched) in &self.watched {
            let Some(trade) = ledger.trade(*id).filter(|t| t.is_open()) else {
                continue;
            };
            for leg in &trade.legs {
                let symbol = leg.contract.symbol();
                if leg.action == OptionAction::Buy
                    && leg.remaining > 0
                    && !watched.done.contains(symbol)
                    && !out.iter().any(|s: &String| s == symbol)
                {
                    out.push(symbol.to_string());
                }
            }
        }
        out.sort();
        out
    }

    /// Legs whose mid reached entry times the profit multiple.
    #[must_use]
    pub fn due_exits(&self, ledger: &PositionLedger, board: &QuoteBoard) -> Vec<HedgeExit> {
        let mut exits = Vec::new();
        for (id, watched) in &self.watched {
            let Some(trade) = ledger.trade(*id).filter(|t| t.is_open()) else {
                continue;
            };
            for leg in &trade.legs {
                let symbol = leg.contract.symbol();
                if leg.action != OptionAction::Buy || leg.remaining == 0 || watched.done.contains(symbol) {
                    continue;
                }
                let Some(quote) = board.get(symbol).filter(|q| q.is_usable()) else {
                    continue;
                };
                if quote.mid() >= leg.entry_price * watched.rule.profit_multiple {
                    exits.push(HedgeExit {
                        trade_id: *id,
                        symbol: symbol.to_string(),
                        fraction: watched.rule.exit_fraction,
                        contracts: exit_size(leg.remaining, watched.rule.exit_fraction),
                        price: quote.bid,
                    });
                }
            }
        }
        exits.sort_by(|a, b| (a.trade_id, &a.symbol).cmp(&(b.trade_id, &b.symbol)));
        exits
    }

    /// Mark an exit as filled so the leg is not exited again.
    pub fn complete(&mut self, exit: &HedgeExit) {
        if let Some(watched) = self.watched.get_mut(&exit.trade_id) {
            watched.done.insert(exit.symbol.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::CommissionModel;
    use crate::domain::market_data::{OptionContract, OptionRight, Quote};
    use crate::domain::trade::{OptionLeg, StructureKind, TradeBuilder};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn open_strangle(ledger: &mut PositionLedger) -> Uuid {
        let expiry = at(10).date();
        let legs = vec![
            OptionLeg::new(OptionContract::new("SPXW", expiry, OptionRight::Put, dec!(5990)), OptionAction::Buy, 1, dec!(2.00), dec!(2.10)),
            OptionLeg::new(OptionContract::new("SPXW", expiry, OptionRight::Call, dec!(6010)), OptionAction::Buy, 1, dec!(1.90), dec!(2.00)),
        ];
        let desc = TradeBuilder::new(StructureKind::Strangle, dec!(100), dec!(6000), at(10)).build_debit(&legs, dec!(10), 4);
        ledger.open_trade(&desc, "hedge", at(10))
    }

    fn rule() -> HedgeExitConfig {
        HedgeExitConfig {
            profit_multiple: dec!(2),
            exit_fraction: dec!(0.5),
        }
    }

    #[test]
    fn exits_leg_at_multiple_once() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = open_strangle(&mut ledger);
        let mut monitor = HedgeMonitor::new();
        monitor.watch(id, rule());
        assert_eq!(monitor.symbols(&ledger).len(), 2);

        let put = ledger.trade(id).unwrap().legs[0].contract.symbol().to_string();
        let mut board = QuoteBoard::new();
        // put entry 2.10, mid 4.30 >= 4.20
        board.insert(put.clone(), Quote::new(dec!(4.20), dec!(4.40), dec!(4.30), 0, at(11)));

        let exits = monitor.due_exits(&ledger, &board);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].symbol, put);
        assert_eq!(exits[0].contracts, 2);
        assert_eq!(exits[0].price, dec!(4.20));

        ledger.partial_exit(id, &put, exits[0].fraction, exits[0].price, at(11)).unwrap();
        monitor.complete(&exits[0]);
        assert!(monitor.due_exits(&ledger, &board).is_empty());
        assert_eq!(monitor.symbols(&ledger).len(), 1);
    }

    #[test]
    fn below_multiple_does_nothing() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = open_strangle(&mut ledger);
        let mut monitor = HedgeMonitor::new();
        monitor.watch(id, rule());

        let put = ledger.trade(id).unwrap().legs[0].contract.symbol().to_string();
        let mut board = QuoteBoard::new();
        board.insert(put, Quote::new(dec!(3.00), dec!(3.20), dec!(3.10), 0, at(11)));
        assert!(monitor.due_exits(&ledger, &board).is_empty());
    }

    #[test]
    fn prune_drops_closed_trades() {
        let mut ledger = PositionLedger::new(dec!(100_000), CommissionModel::zero());
        let id = open_strangle(&mut ledger);
        let mut monitor = HedgeMonitor::new();
        monitor.watch(id, rule());

        ledger.settle_trade(id, dec!(6000), at(16)).unwrap();
        monitor.prune(&ledger);
        assert!(monitor.is_empty());
    }
}
