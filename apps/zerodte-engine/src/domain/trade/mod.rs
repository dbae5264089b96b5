//! Trade Construction Bounded Context
//!
//! Structure templates, priced legs, and immutable trade descriptors.
//!
//! A [`TradeDescriptor`] is built once from a strike search result (credit
//! structures) or a set of priced legs (debit hedges) and never mutated.
//! Short legs are priced at the bid and long legs at the ask.

mod builder;
mod descriptor;
mod option_leg;
mod structure;

pub use builder::{TradeBuilder, validate_liquidity};
pub use descriptor::TradeDescriptor;
pub use option_leg::OptionLeg;
pub use structure::{LegTemplate, StructureKind};
