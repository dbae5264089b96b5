//! Session Bounded Context
//!
//! Trading calendar (weekends plus a holiday list) and regular session hours.

mod calendar;
mod hours;

pub use calendar::TradingCalendar;
pub use hours::SessionHours;
