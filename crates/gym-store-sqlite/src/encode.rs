//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 `YYYY-MM-DD` strings; statuses as their
//! lowercase names.

use std::str::FromStr as _;

use chrono::NaiveDate;
use gym_core::{
  person::Person, plan::Plan, status::Status, subscription::Subscription,
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSubscription::from_row`].
pub const SUBSCRIPTION_COLUMNS: &str =
  "ps.number, ps.person_id, ps.plan_id, ps.start_date, ps.end_date, ps.status";

/// Raw values read directly from a `person_subscriptions` row.
pub struct RawSubscription {
  pub number:     String,
  pub person_id:  i64,
  pub plan_id:    i64,
  pub start_date: String,
  pub end_date:   String,
  pub status:     String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      number:     row.get(0)?,
      person_id:  row.get(1)?,
      plan_id:    row.get(2)?,
      start_date: row.get(3)?,
      end_date:   row.get(4)?,
      status:     row.get(5)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      number:     self.number,
      owner_id:   self.person_id,
      plan_id:    self.plan_id,
      start_date: decode_date(&self.start_date)?,
      end_date:   decode_date(&self.end_date)?,
      status:     decode_status(&self.status)?,
    })
  }
}

pub fn person_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Person> {
  Ok(Person {
    id:        row.get(0)?,
    full_name: row.get(1)?,
    phone:     row.get(2)?,
  })
}

pub fn plan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Plan> {
  Ok(Plan {
    id:            row.get(0)?,
    title:         row.get(1)?,
    price:         row.get(2)?,
    duration_days: row.get(3)?,
    freeze_days:   row.get(4)?,
  })
}
