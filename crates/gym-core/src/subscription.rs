//! Person subscriptions: a binding of a person to a plan over a date range.
//!
//! Internally dates are [`NaiveDate`]s. Callers exchange them as
//! `DD-MM-YYYY` strings ([`WIRE_DATE_FORMAT`]); the conversion lives here so
//! the service and the HTTP layer agree on it.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// `strftime` pattern of dates exchanged with callers, e.g. `05-03-2024`.
pub const WIRE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Length of a subscription created without an explicit end date.
pub const DEFAULT_DURATION: Days = Days::new(30);

// ─── Wire dates ──────────────────────────────────────────────────────────────

/// Parse a wire date. Anything that is not a valid `DD-MM-YYYY` date yields
/// `None`, which callers treat the same as an absent date.
///
/// Day and month must be zero-padded and nothing may surround the date;
/// chrono alone would accept `5-3-2024`.
pub fn parse_wire_date(s: &str) -> Option<NaiveDate> {
  let b = s.as_bytes();
  if b.len() != 10 || b[2] != b'-' || b[5] != b'-' {
    return None;
  }
  NaiveDate::parse_from_str(s, WIRE_DATE_FORMAT).ok()
}

pub fn format_wire_date(date: NaiveDate) -> String {
  date.format(WIRE_DATE_FORMAT).to_string()
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted subscription record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
  /// Caller-supplied primary key; never changes after creation.
  pub number:     String,
  pub owner_id:   i64,
  pub plan_id:    i64,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub status:     Status,
}

impl Subscription {
  /// The status this record should have on `today`.
  pub fn derived_status(&self, today: NaiveDate) -> Status {
    Status::derive(self.start_date, self.end_date, today)
  }
}

// ─── Wire forms ──────────────────────────────────────────────────────────────

/// Request body for creating a subscription.
///
/// Dates are optional strings: missing, empty or malformed values fall back
/// to the creation-day defaults applied by
/// [`LifecycleService::add`](crate::lifecycle::LifecycleService::add).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionForm {
  pub number:     String,
  pub owner_id:   i64,
  pub plan_id:    i64,
  #[serde(default)]
  pub start_date: Option<String>,
  #[serde(default)]
  pub end_date:   Option<String>,
  #[serde(default)]
  pub status:     Option<Status>,
}

/// A subscription as returned to callers, with wire-formatted dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionView {
  pub number:     String,
  pub owner_id:   i64,
  pub plan_id:    i64,
  pub start_date: String,
  pub end_date:   String,
  pub status:     Status,
}

impl From<Subscription> for SubscriptionView {
  fn from(s: Subscription) -> Self {
    Self {
      number:     s.number,
      owner_id:   s.owner_id,
      plan_id:    s.plan_id,
      start_date: format_wire_date(s.start_date),
      end_date:   format_wire_date(s.end_date),
      status:     s.status,
    }
  }
}
