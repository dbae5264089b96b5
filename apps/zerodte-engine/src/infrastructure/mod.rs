//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `market_data/`: in-memory bars and quotes loaded from JSON
//! - `broker/`: paper broker with injectable faults

pub mod broker;
pub mod market_data;
