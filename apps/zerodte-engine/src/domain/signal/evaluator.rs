//! Single-bar entry signal evaluation.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::params::{RangeBaseline, SignalParams};
use crate::domain::market_data::Bar;

/// Whether `bars[index]` is a valid entry bar.
///
/// `proxy_volume[j]` is the volume of the proxy instrument for `bars[j]`.
/// Returns `false` whenever any window reaches before the first bar, the
/// index is past either series, or the first proxy volume is not positive.
#[must_use]
pub fn has_entry_signal(
    bars: &[Bar],
    proxy_volume: &[f64],
    index: usize,
    params: &SignalParams,
) -> bool {
    if index >= bars.len() || index >= proxy_volume.len() {
        return false;
    }

    volume_condition(proxy_volume, index, params)
        && direction_condition(bars, index, params.lookback_candles)
        && range_condition(bars, index, params)
}

/// Inclusive window `[index + 1 - len, index]`, `None` if it starts before bar 0.
pub(super) fn window_start(index: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    (index + 1).checked_sub(len)
}

fn volume_condition(proxy_volume: &[f64], index: usize, params: &SignalParams) -> bool {
    let Some(start) = window_start(index, params.consecutive_candles) else {
        return false;
    };
    let first = proxy_volume[0];
    if first <= 0.0 {
        return false;
    }
    let threshold = params.volume_threshold_fraction * first;
    proxy_volume[start..=index].iter().all(|v| *v <= threshold)
}

fn direction_condition(bars: &[Bar], index: usize, lookback: usize) -> bool {
    let Some(start) = window_start(index, lookback) else {
        return false;
    };
    let window = &bars[start..=index];
    let ups = window.iter().filter(|b| b.is_up()).count();
    ups != 0 && ups != window.len()
}

fn range_condition(bars: &[Bar], index: usize, params: &SignalParams) -> bool {
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

    let recent = mean_range(&bars[recent_start..=index]);
    let baseline = mean_range(&bars[baseline_start..=index]);
    recent < params.range_threshold_fraction * baseline
}

fn mean_range(bars: &[Bar]) -> f64 {
    let total: Decimal = bars.iter().map(Bar::range).sum();
    total.to_f64().unwrap_or_default() / bars.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use test_case::test_case;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(i as i64)
    }

    /// Bar with the given direction and range around 6000.
    fn bar(i: usize, up: bool, range: i64) -> Bar {
        let (open, close) = if up {
            (Decimal::from(6000), Decimal::from(6001))
        } else {
            (Decimal::from(6001), Decimal::from(6000))
        };
        Bar::new(
            ts(i),
            open,
            Decimal::from(6000 + range),
            Decimal::from(6000),
            close,
            0,
        )
    }

    /// Wide opening bars followed by tight alternating bars, volume fading.
    fn quiet_session(n: usize) -> (Vec<Bar>, Vec<f64>) {
        let bars = (0..n)
            .map(|i| if i < 4 { bar(i, true, 10) } else { bar(i, i % 2 == 0, 2) })
            .collect();
        let volume = (0..n).map(|i| if i < 4 { 1000.0 } else { 300.0 }).collect();
        (bars, volume)
    }

    fn params() -> SignalParams {
        SignalParams {
            consecutive_candles: 3,
            volume_threshold_fraction: 0.5,
            lookback_candles: 4,
            avg_range_candles: 3,
            range_threshold_fraction: 0.8,
            range_baseline: RangeBaseline::SinceOpen,
        }
    }

    #[test]
    fn signal_fires_on_quiet_mixed_bars() {
        let (bars, volume) = quiet_session(10);
        assert!(has_entry_signal(&bars, &volume, 8, &params()));
    }

    #[test_case(0 ; "first bar")]
    #[test_case(1 ; "second bar")]
    #[test_case(2 ; "window starts before open")]
    fn insufficient_history_is_no_signal(index: usize) {
        let (bars, volume) = quiet_session(10);
        let params = SignalParams {
            lookback_candles: 4,
            ..params()
        };
        assert!(!has_entry_signal(&bars, &volume, index, &params));
    }

    #[test]
    fn index_past_end_is_no_signal() {
        let (bars, volume) = quiet_session(10);
        assert!(!has_entry_signal(&bars, &volume, 10, &params()));
        assert!(!has_entry_signal(&bars, &volume[..5], 8, &params()));
        assert!(!has_entry_signal(&[], &[], 0, &params()));
    }

    #[test]
    fn same_direction_window_fails() {
        let (mut bars, volume) = quiet_session(10);
        for (i, b) in bars.iter_mut().enumerate().skip(5) {
            *b = bar(i, true, 2);
        }
        assert!(!has_entry_signal(&bars, &volume, 8, &params()));
    }

    #[test]
    fn heavy_volume_fails() {
        let (bars, mut volume) = quiet_session(10);
        volume[7] = 600.0;
        assert!(!has_entry_signal(&bars, &volume, 8, &params()));
    }

    #[test]
    fn non_positive_opening_volume_fails() {
        let (bars, mut volume) = quiet_session(10);
        volume[0] = 0.0;
        assert!(!has_entry_signal(&bars, &volume, 8, &params()));
    }

    #[test]
    fn expanding_range_fails() {
        let (mut bars, volume) = quiet_session(10);
        bars[8] = bar(8, true, 30);
        assert!(!has_entry_signal(&bars, &volume, 8, &params()));
    }

    #[test]
    fn trailing_baseline_ignores_opening_bars() {
        let (bars, volume) = quiet_session(12);
        let params = SignalParams {
            range_baseline: RangeBaseline::Trailing(4),
            ..params()
        };
        // Trailing window holds only tight bars, so the recent range is not
        // meaningfully smaller than the baseline.
        assert!(!has_entry_signal(&bars, &volume, 11, &params));

        let short = SignalParams {
            range_baseline: RangeBaseline::Trailing(20),
            ..params
        };
        assert!(!has_entry_signal(&bars, &volume, 11, &short));
    }
}
