//! Source of "now" and "today" for date-gated transitions.
//!
//! Every date comparison in the crate uses the UTC calendar day returned by
//! [`Clock::today`]. Time of day never takes part in a guard.

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that can be set and advanced by hand (tests, previews).
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::sync::Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(parking_lot::Mutex::new(now)),
        }
    }

    /// A clock fixed at noon UTC on the given day.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(noon_utc(date))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(noon_utc(date));
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock();
        *now += chrono::Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0)
        .unwrap_or_default()
        .and_utc()
}
