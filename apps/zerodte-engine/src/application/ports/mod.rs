//! Application Ports (Driven)
//!
//! Interfaces the engine uses to reach market data and the broker. Adapters
//! live in the infrastructure layer.

mod broker_port;
mod market_data_port;

#[cfg(test)]
pub use market_data_port::MockMarketDataPort;

pub use broker_port::{BrokerError, BrokerEvent, BrokerPort, ComboContract, ComboLeg, ComboOrder, OrderResult};
pub use market_data_port::{MarketDataError, MarketDataPort};
