//! Target-ratio strike distance search.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::trade::OptionLeg;

/// Refinement iterations before the search gives up narrowing.
const MAX_REFINE_STEPS: usize = 64;

/// Wing narrowing accepts a distance keeping at least this share of credit.
const NARROW_CREDIT_SHARE: Decimal = Decimal::from_parts(95, 0, 0, false, 2);

/// Oracle answer for one distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureQuote {
    /// Net credit per share.
    pub net_credit: Decimal,
    /// Maximum loss per share.
    pub max_loss: Decimal,
    /// Priced legs.
    pub legs: Vec<OptionLeg>,
}

impl StructureQuote {
    fn is_valid(&self) -> bool {
        self.net_credit > Decimal::ZERO && self.max_loss > Decimal::ZERO
    }

    fn ratio(&self) -> Decimal {
        self.net_credit / self.max_loss
    }
}

/// Best distance found by [`find_strikes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrikeResult {
    /// Center strike the structure is built around.
    pub center_strike: Decimal,
    /// Wing distance.
    pub distance: Decimal,
    /// Net credit per share.
    pub net_credit: Decimal,
    /// Maximum loss per share.
    pub max_loss: Decimal,
    /// `net_credit / max_loss`.
    pub ratio: Decimal,
    /// Priced legs.
    pub legs: Vec<OptionLeg>,
}

impl StrikeResult {
    fn from_quote(center_strike: Decimal, distance: Decimal, quote: StructureQuote) -> Self {
        Self {
            center_strike,
            distance,
            ratio: quote.ratio(),
            net_credit: quote.net_credit,
            max_loss: quote.max_loss,
            legs: quote.legs,
        }
    }
}

/// Memoised probe state for one search.
struct Search<F> {
    oracle: F,
    probes: HashMap<Decimal, Option<StructureQuote>>,
    best: Option<(Decimal, Decimal)>,
    target_ratio: Decimal,
    tolerance: Decimal,
}

impl<F> Search<F>
where
    F: FnMut(Decimal) -> Option<StructureQuote>,
{
    /// Probe `distance`, returning its ratio when valid.
    fn probe(&mut self, distance: Decimal) -> Option<Decimal> {
        let oracle = &mut self.oracle;
        let ratio = self
            .probes
            .entry(distance)
            .or_insert_with(|| oracle(distance).filter(StructureQuote::is_valid))
            .as_ref()
            .map(StructureQuote::ratio)?;

        let diff = (ratio - self.target_ratio).abs();
        if self.best.is_none_or(|(_, best_diff)| diff < best_diff) {
            self.best = Some((distance, diff));
        }
        Some(ratio)
    }

    fn within_tolerance(&self) -> bool {
        self.best
            .is_some_and(|(_, diff)| diff <= self.tolerance)
    }

    fn best_distance(&self) -> Option<Decimal> {
        self.best.map(|(d, _)| d)
    }

    fn into_result(mut self, center_strike: Decimal) -> Option<StrikeResult> {
        let distance = self.best_distance()?;
        let quote = self.probes.remove(&distance).flatten()?;
        Some(StrikeResult::from_quote(center_strike, distance, quote))
    }
}

/// Find the wing distance whose credit/risk ratio is closest to `target_ratio`.
///
/// Probes `min_distance`, the step-aligned midpoint and `max_distance`, then
/// bisects toward the target. Ratio is assumed to fall as distance grows
/// unless both endpoint probes show the opposite. An invalid probe during
/// bisection moves the bound on that side toward the best valid distance.
///
/// Midpoints snap down to `min_distance + k * step`, not to absolute
/// multiples of `step`, so an off-grid `max_distance` is tried in addition
/// to that grid. [`search_distances`] lists every distance that can be asked.
///
/// The first probe within `tolerance` ends the search. Otherwise the probe
/// with the smallest `|ratio - target_ratio|` wins, earlier probes winning
/// ties. Returns `None` when no probe was valid.
#[must_use]
pub fn find_strikes<F>(
    center_strike: Decimal,
    min_distance: Decimal,
    max_distance: Decimal,
    step: Decimal,
    target_ratio: Decimal,
    tolerance: Decimal,
    oracle: F,
) -> Option<StrikeResult>
where
    F: FnMut(Decimal) -> Option<StructureQuote>,
{
    if step <= Decimal::ZERO || min_distance <= Decimal::ZERO || min_distance > max_distance {
        return None;
    }

    let align = |x: Decimal| min_distance + ((x - min_distance) / step).floor() * step;
    let mut search = Search {
        oracle,
        probes: HashMap::new(),
        best: None,
        target_ratio,
        tolerance,
    };

    let mid = align((min_distance + max_distance) / Decimal::TWO);
    let mut endpoints = [None, None];
    for (slot, distance) in [(Some(0), min_distance), (None, mid), (Some(1), max_distance)] {
        let ratio = search.probe(distance);
        if let Some(i) = slot {
            endpoints[i] = ratio;
        }
        if search.within_tolerance() {
            return search.into_result(center_strike);
        }
    }

    let decreasing = match endpoints {
        [Some(low), Some(high)] => low >= high,
        _ => true,
    };

    let (mut lo, mut hi) = (min_distance, max_distance);
    for _ in 0..MAX_REFINE_STEPS {
        if hi - lo <= step {
            break;
        }
        let mid = align((lo + hi) / Decimal::TWO);
        if mid <= lo || mid >= hi {
            break;
        }

        match search.probe(mid) {
            Some(ratio) => {
                if search.within_tolerance() {
                    break;
                }
                let widen = if decreasing {
                    ratio > target_ratio
                } else {
                    ratio < target_ratio
                };
                if widen {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            None => match search.best_distance() {
                Some(best) if best > mid => lo = mid,
                _ => hi = mid,
            },
        }
    }

    search.into_result(center_strike)
}

/// Prefer narrower wings that keep most of the credit.
///
/// Walks from `floor` upward by `step` while below `chosen.distance` and
/// returns the first distance whose credit is at least 95% of the chosen
/// credit. Falls back to `chosen`.
#[must_use]
pub fn narrow_wings<F>(chosen: StrikeResult, floor: Decimal, step: Decimal, mut oracle: F) -> StrikeResult
where
    F: FnMut(Decimal) -> Option<StructureQuote>,
{
    if step <= Decimal::ZERO {
        return chosen;
    }
    let required = chosen.net_credit * NARROW_CREDIT_SHARE;
    let mut distance = floor;
    while distance < chosen.distance {
        if let Some(quote) = oracle(distance).filter(StructureQuote::is_valid)
            && quote.net_credit >= required
        {
            return StrikeResult::from_quote(chosen.center_strike, distance, quote);
        }
        distance += step;
    }
    chosen
}

/// Every distance [`find_strikes`] and [`narrow_wings`] may ask the oracle
/// for, ascending and deduplicated.
///
/// Covers the `min_distance + k * step` grid up to `max_distance`,
/// `max_distance` itself, and the `floor + k * step` grid below
/// `max_distance` when a narrowing floor is set.
#[must_use]
pub fn search_distances(min_distance: Decimal, max_distance: Decimal, step: Decimal, floor: Option<Decimal>) -> Vec<Decimal> {
    let mut distances = Vec::new();
    if step <= Decimal::ZERO || min_distance > max_distance {
        return distances;
    }
    let mut distance = min_distance;
    while distance <= max_distance {
        distances.push(distance);
        distance += step;
    }
    distances.push(max_distance);
    if let Some(floor) = floor {
        let mut distance = floor;
        while distance < max_distance {
            distances.push(distance);
            distance += step;
        }
    }
    distances.sort_unstable();
    distances.dedup();
    distances
}
