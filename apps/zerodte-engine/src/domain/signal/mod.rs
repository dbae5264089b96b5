//! Entry Signal Bounded Context
//!
//! Decides whether a bar is a valid entry point from three ANDed conditions
//! over intraday bars and a proxy volume series:
//!
//! 1. **Volume**: proxy volume over the last `consecutive_candles` bars stays
//!    at or below `volume_threshold_fraction` of the first bar's volume.
//! 2. **Direction**: the last `lookback_candles` bars are not all up or all
//!    down.
//! 3. **Range**: the mean high-low range of the last `avg_range_candles` bars
//!    is strictly below `range_threshold_fraction` of the baseline mean range.
//!
//! Insufficient history is never an error, it is simply "no signal".

mod evaluator;
mod frame;
mod params;

pub use evaluator::has_entry_signal;
pub use frame::SignalFrame;
pub use params::{RangeBaseline, SignalParams};
