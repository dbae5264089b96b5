//! Domain Layer
//!
//! Pure decision logic with no I/O. Everything here is synchronous; the
//! application layer owns every suspension point.
//!
//! # Bounded Contexts
//!
//! - [`market_data`]: bars, quotes, option contracts and symbols
//! - [`signal`]: entry signal evaluation over intraday bars
//! - [`strike_selection`]: target-ratio wing distance search and quote boards
//! - [`trade`]: structure templates, legs and immutable trade descriptors
//! - [`guardrails`]: kill switch, risk limits and the approval gate
//! - [`ledger`]: trade lifecycle, equity curve and performance statistics
//! - [`session`]: trading calendar and session hours

pub mod guardrails;
pub mod ledger;
pub mod market_data;
pub mod session;
pub mod shared;
pub mod signal;
pub mod strike_selection;
pub mod trade;
