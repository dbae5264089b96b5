//! Ledger errors.

use thiserror::Error;
use uuid::Uuid;

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No trade with this id.
    #[error("trade {id} not found")]
    TradeNotFound {
        /// Requested id.
        id: Uuid,
    },

    /// Trade already closed.
    #[error("trade {id} is already closed")]
    TradeClosed {
        /// Requested id.
        id: Uuid,
    },

    /// Trade has no leg with this symbol.
    #[error("trade {id} has no leg {symbol}")]
    LegNotFound {
        /// Trade id.
        id: Uuid,
        /// Requested symbol.
        symbol: String,
    },

    /// Exit fraction outside (0, 1].
    #[error("exit fraction {0} must be in (0, 1]")]
    InvalidFraction(String),

    /// Missing exit price for a leg.
    #[error("no exit price for {symbol}")]
    MissingPrice {
        /// Leg symbol.
        symbol: String,
    },
}
