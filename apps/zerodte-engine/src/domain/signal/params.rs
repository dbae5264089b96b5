//! Signal parameters.

use serde::{Deserialize, Serialize};

/// Window used as the denominator of the range condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBaseline {
    /// Every bar from the day open through the current bar.
    #[default]
    SinceOpen,
    /// A fixed number of trailing bars ending at the current bar.
    Trailing(usize),
}

/// Entry signal parameters for one strategy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    /// Bars whose proxy volume must stay under the threshold.
    #[serde(default = "default_consecutive_candles")]
    pub consecutive_candles: usize,
    /// Threshold as a fraction of the first bar's proxy volume.
    #[serde(default = "default_volume_threshold_fraction")]
    pub volume_threshold_fraction: f64,
    /// Bars inspected for mixed direction.
    #[serde(default = "default_lookback_candles")]
    pub lookback_candles: usize,
    /// Bars averaged for the recent range.
    #[serde(default = "default_avg_range_candles")]
    pub avg_range_candles: usize,
    /// Recent range must be below this fraction of the baseline range.
    #[serde(default = "default_range_threshold_fraction")]
    pub range_threshold_fraction: f64,
    /// Baseline window for the range condition.
    #[serde(default)]
    pub range_baseline: RangeBaseline,
}

const fn default_consecutive_candles() -> usize {
    3
}

const fn default_volume_threshold_fraction() -> f64 {
    0.5
}

const fn default_lookback_candles() -> usize {
    5
}

const fn default_avg_range_candles() -> usize {
    3
}

const fn default_range_threshold_fraction() -> f64 {
    0.8
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            consecutive_candles: default_consecutive_candles(),
            volume_threshold_fraction: default_volume_threshold_fraction(),
            lookback_candles: default_lookback_candles(),
            avg_range_candles: default_avg_range_candles(),
            range_threshold_fraction: default_range_threshold_fraction(),
            range_baseline: RangeBaseline::default(),
        }
    }
}

impl SignalParams {
    /// Smallest bar index at which every window fits.
    #[must_use]
    pub fn warmup_bars(&self) -> usize {
        let trailing = match self.range_baseline {
            RangeBaseline::SinceOpen => 1,
            RangeBaseline::Trailing(n) => n,
        };
        self.consecutive_candles
            .max(self.lookback_candles)
            .max(self.avg_range_candles)
            .max(trailing)
            .saturating_sub(1)
    }

    /// Validate the parameter set.
    pub fn validate(&self) -> Result<(), String> {
        if self.consecutive_candles == 0 || self.lookback_candles < 2 || self.avg_range_candles == 0 {
            return Err(
                "consecutive_candles and avg_range_candles must be >= 1, lookback_candles >= 2"
                    .to_string(),
            );
        }
        if !(self.volume_threshold_fraction > 0.0 && self.range_threshold_fraction > 0.0) {
            return Err("threshold fractions must be positive".to_string());
        }
        if self.range_baseline == RangeBaseline::Trailing(0) {
            return Err("trailing range baseline must cover at least one bar".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_uses_widest_window() {
        let params = SignalParams {
            consecutive_candles: 3,
            lookback_candles: 5,
            avg_range_candles: 3,
            range_baseline: RangeBaseline::Trailing(12),
            ..SignalParams::default()
        };
        assert_eq!(params.warmup_bars(), 11);

        let params = SignalParams::default();
        assert_eq!(params.warmup_bars(), 4);
    }

    #[test]
    fn validate_rejects_single_bar_lookback() {
        let params = SignalParams {
            lookback_candles: 1,
            ..SignalParams::default()
        };
        assert!(params.validate().is_err());
        assert!(SignalParams::default().validate().is_ok());
    }
}
