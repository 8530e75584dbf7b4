//! Wall-clock access for date-dependent decisions.
//!
//! "Today" (current menu lookup) and "now" (retention, `last_updated`) are
//! read through `Clock` so callers can pin them.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use std::sync::{Mutex, PoisonError};

/// Source of the current instant and the current calendar day.
pub trait Clock: Send + Sync {
    /// Current instant, used for `last_updated` stamps.
    fn now(&self) -> DateTime<Utc>;
    /// Current calendar day as seen by menu viewers.
    fn today(&self) -> NaiveDate;
}

/// Process wall clock. `today` follows the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Pins the clock to noon UTC of `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(noon_utc(date))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(noon_utc(date));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN + chrono::Duration::hours(12))
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock};
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_reports_pinned_day() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();
        let clock = FixedClock::at_date(date);
        assert_eq!(clock.today(), date);

        let next = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        clock.set_date(next);
        assert_eq!(clock.today(), next);
        assert_eq!(clock.now().date_naive(), next);
    }
}
