//! The status sweep: re-derive every subscription's status and persist the
//! ones that drifted.
//!
//! A sweep is fail-fast. The first storage error aborts it and records that
//! were already corrected stay corrected; the next scheduled sweep picks up
//! the rest. Scheduling (cadence, non-overlap) is the caller's concern.

use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{Error, Result, store::SubscriptionStore};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  /// Records whose status was recomputed.
  pub examined:  usize,
  /// Records whose stored status was rewritten.
  pub updated:   usize,
  /// Records that disappeared between the fetch and their update.
  pub skipped:   usize,
  /// `true` if the sweep stopped early because `cancel` fired.
  pub cancelled: bool,
}

/// Run one sweep against `store` as of `today`.
///
/// `cancel` is checked before each record; once it fires the sweep returns
/// what it has done so far with [`SweepReport::cancelled`] set.
pub async fn sweep<S>(
  store: &S,
  today: NaiveDate,
  cancel: &CancellationToken,
) -> Result<SweepReport>
where
  S: SubscriptionStore,
{
  let records = store
    .list_subscriptions()
    .await
    .map_err(Error::storage("sweep: list subscriptions"))?;

  let mut report = SweepReport::default();

  for record in records {
    if cancel.is_cancelled() {
      warn!(examined = report.examined, "sweep cancelled");
      report.cancelled = true;
      break;
    }
    report.examined += 1;

    let next = record.derived_status(today);
    if next == record.status {
      continue;
    }

    let affected = store
      .update_subscription_status(&record.number, next)
      .await
      .map_err(|e| {
        error!(number = %record.number, error = %e, "failed to update status");
        Error::Storage { op: "sweep: update status", source: e }
      })?;

    if affected == 0 {
      warn!(number = %record.number, "subscription vanished before its status update");
      report.skipped += 1;
    } else {
      debug!(number = %record.number, from = %record.status, to = %next, "status updated");
      report.updated += 1;
    }
  }

  Ok(report)
}
