//! Application Layer
//!
//! - **Ports**: market data and broker interfaces
//! - **Services**: pipeline, sequence state and the orchestrators

pub mod ports;
pub mod services;
