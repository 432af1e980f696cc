//! Clock abstraction for the daily cache window.
//!
//! "Today" is the server's local calendar date; injecting the clock lets
//! tests cross date boundaries without waiting for a real day to pass.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of the current instant and calendar date.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date in the server's local time zone.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation used in production.
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
