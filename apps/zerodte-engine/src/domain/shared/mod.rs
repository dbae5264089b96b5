//! Shared Domain Types
//!
//! Clock abstraction and decimal math shared across bounded contexts.

pub mod clock;
pub mod math;

pub use clock::{Clock, ManualClock, SystemClock};
