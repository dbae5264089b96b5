//! Broker Adapters
//!
//! Implementations of `BrokerPort`.

mod paper;

pub use paper::{PaperBroker, PaperOrder, PaperOrderStatus};
