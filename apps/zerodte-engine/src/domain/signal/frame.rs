//! Columnar view over a session's bars.
//!
//! Holds prefix sums of bar ranges and up-bar counts so every condition is
//! O(1) per bar (volume is O(`consecutive_candles`)). The backtest builds one
//! frame per day and scans it; the live loop rebuilds it per poll.

use rust_decimal::prelude::ToPrimitive;

use super::evaluator::window_start;
use super::params::{RangeBaseline, SignalParams};
use crate::domain::market_data::Bar;

/// Struct-of-arrays signal input for one session.
#[derive(Debug, Clone, Default)]
pub struct SignalFrame {
    range_prefix: Vec<f64>,
    up_prefix: Vec<usize>,
    proxy_volume: Vec<f64>,
}

impl SignalFrame {
    /// Build a frame from bars and the matching proxy volume series.
    #[must_use]
    pub fn new(bars: &[Bar], proxy_volume: &[f64]) -> Self {
        let mut range_prefix = Vec::with_capacity(bars.len() + 1);
        let mut up_prefix = Vec::with_capacity(bars.len() + 1);
        range_prefix.push(0.0);
        up_prefix.push(0);

        let mut range_total = 0.0;
        let mut ups = 0;
        for bar in bars {
            range_total += bar.range().to_f64().unwrap_or_default();
            ups += usize::from(bar.is_up());
            range_prefix.push(range_total);
            up_prefix.push(ups);
        }

        Self {
            range_prefix,
            up_prefix,
            proxy_volume: proxy_volume.to_vec(),
        }
    }

    /// Number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.up_prefix.len() - 1
    }

    /// True when the frame has no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether bar `index` is a valid entry bar.
    #[must_use]
    pub fn has_entry_signal(&self, index: usize, params: &SignalParams) -> bool {
        if index >= self.len() || index >= self.proxy_volume.len() {
            return false;
        }
        self.volume_ok(index, params) && self.direction_ok(index, params) && self.range_ok(index, params)
    }

    /// Signal flag for every bar.
    #[must_use]
    pub fn entry_signal_series(&self, params: &SignalParams) -> Vec<bool> {
        (0..self.len())
            .map(|i| self.has_entry_signal(i, params))
            .collect()
    }

    fn volume_ok(&self, index: usize, params: &SignalParams) -> bool {
        let Some(start) = window_start(index, params.consecutive_candles) else {
            return false;
        };
        let first = self.proxy_volume[0];
        if first <= 0.0 {
            return false;
        }
        let threshold = params.volume_threshold_fraction * first;
        self.proxy_volume[start..=index].iter().all(|v| *v <= threshold)
    }

    fn direction_ok(&self, index: usize, params: &SignalParams) -> bool {
        let Some(start) = window_start(index, params.lookback_candles) else {
            return false;
        };
        let ups = self.up_prefix[index + 1] - self.up_prefix[start];
        ups != 0 && ups != index + 1 - start
    }

    fn range_ok(&self, index: usize, params: &SignalParams) -> bool {
        let Some(recent_start) = window_start(index, params.avg_range_candles) else {
            return false;
        };
        let baseline_start = match params.range_baseline {
            RangeBaseline::SinceOpen => Some(0),
            RangeBaseline::Trailing(n) => window_start(index, n),
        };
        let Some(baseline_start) = baseline_start else {
            return false;
        };
        self.mean_range(recent_start, index) < params.range_threshold_fraction * self.mean_range(baseline_start, index)
    }

    fn mean_range(&self, start: usize, end: usize) -> f64 {
        (self.range_prefix[end + 1] - self.range_prefix[start]) / (end + 1 - start) as f64
    }
}
