//! Source of "today" for status derivation.

use chrono::{NaiveDate, Utc};

/// Supplies the calendar day used when deriving subscription status.
pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// Wall-clock day in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate { Utc::now().date_naive() }
}

/// A clock pinned to a single day. Useful for tests and for replaying a sweep
/// as of a given date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate { self.0 }
}
