//! Position Ledger Bounded Context
//!
//! Records trade lifecycles, realized P&L, the equity curve and the daily
//! P&L series, and derives performance statistics from them.

mod commission;
mod errors;
mod ledger_trade;
mod position_ledger;
mod statistics;

pub use commission::CommissionModel;
pub use errors::LedgerError;
pub use ledger_trade::{ExitKind, ExitRecord, LedgerLeg, LedgerTrade, LegRecord, TradeRecord, TradeStatus};
pub use position_ledger::{DailyPnl, EquityPoint, PositionLedger, exit_size};
pub use statistics::{LedgerStatistics, StructureStats};
