use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Regular session hours in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHours {
    /// First tradable minute.
    pub open: NaiveTime,
    /// Session close.
    pub close: NaiveTime,
}

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl SessionHours {
    /// Hours from `open` to `close`.
    #[must_use]
    pub const fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Whether `at` falls in `[open, close)`.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let t = at.time();
        t >= self.open && t < self.close
    }

    /// Whether the session is over for `at`'s date.
    #[must_use]
    pub fn is_closed_for_day(&self, at: NaiveDateTime) -> bool {
        at.time() >= self.close
    }

    /// Session close on `at`'s date.
    #[must_use]
    pub fn close_at(&self, at: NaiveDateTime) -> NaiveDateTime {
        at.date().and_time(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn contains_is_half_open() {
        let hours = SessionHours::default();
        assert!(!hours.contains(at(9, 29)));
        assert!(hours.contains(at(9, 30)));
        assert!(hours.contains(at(15, 59)));
        assert!(!hours.contains(at(16, 0)));
        assert!(hours.is_closed_for_day(at(16, 0)));
        assert_eq!(hours.close_at(at(11, 0)), at(16, 0));
    }
}
