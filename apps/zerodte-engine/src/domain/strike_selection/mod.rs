//! Strike Selection Bounded Context
//!
//! Searches the wing distance of a credit structure whose credit/risk ratio
//! is closest to a target, probing a synchronous quote oracle.

mod optimizer;
mod quote_board;

pub use optimizer::{StrikeResult, StructureQuote, find_strikes, narrow_wings, search_distances};
pub use quote_board::QuoteBoard;
