//! Market Data Bounded Context
//!
//! Intraday bars, option quotes and contract identity.

mod bar;
mod option_contract;
mod quote;

pub use bar::Bar;
pub use option_contract::{OptionAction, OptionContract, OptionRight, atm_strike, contract_symbol};
pub use quote::Quote;
