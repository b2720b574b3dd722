//! Error types for `gym-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the [`LifecycleService`](crate::lifecycle::LifecycleService).
#[derive(Debug, Error)]
pub enum Error {
  #[error("subscription with number {0:?} already exists")]
  SubscriptionAlreadyExists(String),

  #[error("subscription {0:?} not found")]
  SubscriptionNotFound(String),

  #[error("person {0} not found")]
  OwnerNotFound(i64),

  #[error("plan {0} not found")]
  PlanNotFound(i64),

  /// Another sweep holds the sweep lock; this one did not start.
  #[error("a status sweep is already running")]
  SweepInProgress,

  #[error("end date {end} is before start date {start}")]
  InvalidDateRange { start: NaiveDate, end: NaiveDate },

  /// An unclassified storage failure, tagged with the operation that hit it.
  #[error("{op}: {source}")]
  Storage {
    op:     &'static str,
    #[source]
    source: StoreError,
  },
}

impl Error {
  pub(crate) fn storage(op: &'static str) -> impl FnOnce(StoreError) -> Self {
    move |source| Self::Storage { op, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
