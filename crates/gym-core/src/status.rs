//! Subscription status and the rule that derives it from a date range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Where a subscription sits in its lifecycle relative to "today".
///
/// The string forms (`"frozen"`, `"active"`, `"expired"`) are shared by the
/// JSON wire format and the `status` database column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  /// Not yet begun.
  Frozen,
  /// Currently valid.
  Active,
  /// Past its end date.
  Expired,
}

impl Status {
  /// Derive the status of a subscription spanning `start..=end` on `today`.
  ///
  /// Precedence: a subscription that has not started is `Frozen` even if its
  /// end date is also in the past; otherwise one whose end date has passed is
  /// `Expired`; everything else is `Active`. Both bounds are inclusive.
  pub fn derive(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
    if start > today {
      Self::Frozen
    } else if end < today {
      Self::Expired
    } else {
      Self::Active
    }
  }
}
