//! Session hours, polling cadence and the holiday list.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::session::{SessionHours, TradingCalendar};

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Regular session open, exchange-local.
    #[serde(default = "default_open")]
    pub open: NaiveTime,
    /// Regular session close, exchange-local.
    #[serde(default = "default_close")]
    pub close: NaiveTime,
    /// Live polling interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Bound on one quote batch fetch, in milliseconds.
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    /// Exchange holidays.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
            poll_interval_secs: default_poll_interval_secs(),
            quote_timeout_ms: default_quote_timeout_ms(),
            holidays: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Session hours.
    #[must_use]
    pub const fn hours(&self) -> SessionHours {
        SessionHours::new(self.open, self.close)
    }

    /// Trading calendar with the configured holidays.
    #[must_use]
    pub fn calendar(&self) -> TradingCalendar {
        TradingCalendar::new(self.holidays.iter().copied())
    }
}

fn default_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn default_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
}

const fn default_poll_interval_secs() -> u64 {
    60
}

const fn default_quote_timeout_ms() -> u64 {
    2_000
}
