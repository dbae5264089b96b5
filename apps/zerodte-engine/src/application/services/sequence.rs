//! Per-day progress through the strategy sequence.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Which steps have traded today and which are waiting on approval.
///
/// With a dependent sequence, step k becomes eligible only after step k-1
/// executed on the same day. Each step trades at most once per day.
#[derive(Debug, Clone)]
pub struct SequenceState {
    steps: Vec<String>,
    dependent: bool,
    day: Option<NaiveDate>,
    executed: BTreeSet<String>,
    in_flight: BTreeSet<String>,
}

impl SequenceState {
    /// Track `steps` in order.
    #[must_use]
    pub fn new(steps: Vec<String>, dependent: bool) -> Self {
        Self {
            steps,
            dependent,
            day: None,
            executed: BTreeSet::new(),
            in_flight: BTreeSet::new(),
        }
    }

    /// Start a fresh day. A no-op when `date` is already current.
    pub fn reset_for(&mut self, date: NaiveDate) {
        if self.day != Some(date) {
            self.day = Some(date);
            self.executed.clear();
            self.in_flight.clear();
        }
    }

    /// Steps that may be evaluated now, in sequence order.
    #[must_use]
    pub fn eligible(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (i, step) in self.steps.iter().enumerate() {
            if self.executed.contains(step) || self.in_flight.contains(step) {
                continue;
            }
            if self.dependent && i > 0 && !self.executed.contains(&self.steps[i - 1]) {
                continue;
            }
            out.push(step.as_str());
        }
        out
    }

    /// A step was submitted and awaits approval.
    pub fn mark_in_flight(&mut self, step: &str) {
        self.in_flight.insert(step.to_string());
    }

    /// A submitted step resolved without a fill.
    pub fn clear_in_flight(&mut self, step: &str) {
        self.in_flight.remove(step);
    }

    /// A step traded.
    pub fn mark_executed(&mut self, step: &str) {
        self.in_flight.remove(step);
        self.executed.insert(step.to_string());
    }

    /// Whether `step` traded today.
    #[must_use]
    pub fn is_executed(&self, step: &str) -> bool {
        self.executed.contains(step)
    }

    /// Whether every step traded today.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| self.executed.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(dependent: bool) -> SequenceState {
        SequenceState::new(vec!["fly".into(), "condor".into(), "hedge".into()], dependent)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn dependent_sequence_unlocks_in_order() {
        let mut s = state(true);
        s.reset_for(date(17));
        assert_eq!(s.eligible(), vec!["fly"]);

        s.mark_executed("fly");
        assert_eq!(s.eligible(), vec!["condor"]);

        s.mark_executed("condor");
        s.mark_executed("hedge");
        assert!(s.eligible().is_empty());
        assert!(s.is_complete());
    }

    #[test]
    fn independent_sequence_offers_all_unresolved() {
        let mut s = state(false);
        s.reset_for(date(17));
        s.mark_executed("condor");
        assert_eq!(s.eligible(), vec!["fly", "hedge"]);
    }

    #[test]
    fn in_flight_step_is_not_offered_twice() {
        let mut s = state(true);
        s.reset_for(date(17));
        s.mark_in_flight("fly");
        assert!(s.eligible().is_empty());

        s.clear_in_flight("fly");
        assert_eq!(s.eligible(), vec!["fly"]);
    }

    #[test]
    fn reset_happens_once_per_date() {
        let mut s = state(true);
        s.reset_for(date(17));
        s.mark_executed("fly");
        s.reset_for(date(17));
        assert!(s.is_executed("fly"));

        s.reset_for(date(20));
        assert!(!s.is_executed("fly"));
        assert_eq!(s.eligible(), vec!["fly"]);
    }
}
