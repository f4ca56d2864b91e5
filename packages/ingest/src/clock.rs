//! Time source for the pipeline and scheduler.

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};

/// Supplies the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time, used for job and row timestamps and cadence math.
    fn now(&self) -> NaiveDateTime;

    /// Current local wall-clock time, the frame the publisher's reports and
    /// the weather API are expressed in.
    fn local_now(&self) -> NaiveDateTime;

    /// The publisher's "current" report date.
    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
