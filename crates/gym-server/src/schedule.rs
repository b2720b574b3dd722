//! Background task that keeps stored statuses in step with the calendar.
//!
//! Sweeps run one at a time on a single task: the next tick is only awaited
//! after the current sweep returns, and ticks missed meanwhile are dropped.
//! A tick that lands while an on-demand sweep holds the service's sweep lock
//! is skipped.

use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use gym_core::{lifecycle::LifecycleService, store::SubscriptionStore};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The first instant of the UTC day after `now`.
pub fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
  now
    .date_naive()
    .checked_add_days(Days::new(1))
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .unwrap_or(now)
}

/// Sweep every `every`, starting at the next UTC midnight, until `cancel`
/// fires. With `on_startup` an extra sweep runs immediately.
pub async fn run_scheduler<S>(
  service: LifecycleService<S>,
  every: Duration,
  on_startup: bool,
  cancel: CancellationToken,
) where
  S: SubscriptionStore,
{
  if on_startup {
    sweep_once(&service, &cancel).await;
  }

  let now = Utc::now();
  let first = next_midnight(now);
  let delay = (first - now).to_std().unwrap_or(Duration::ZERO);
  info!(first = %first, every_secs = every.as_secs(), "sweep scheduled");

  let mut ticks = interval_at(Instant::now() + delay, every);
  ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

  loop {
    tokio::select! {
      _ = cancel.cancelled() => break,
      _ = ticks.tick() => sweep_once(&service, &cancel).await,
    }
  }
  info!("sweep scheduler stopped");
}

async fn sweep_once<S: SubscriptionStore>(
  service: &LifecycleService<S>,
  cancel: &CancellationToken,
) {
  let today = service.today();
  match service.run_status_sweep(today, cancel).await {
    Ok(report) => info!(
      %today,
      examined = report.examined,
      updated = report.updated,
      skipped = report.skipped,
      "scheduled sweep done"
    ),
    Err(gym_core::Error::SweepInProgress) => {
      info!(%today, "scheduled sweep skipped, another sweep is running")
    }
    Err(e) => error!(%today, error = %e, "scheduled sweep failed"),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::{NaiveDate, TimeZone as _};
  use gym_core::{
    person::NewPerson,
    plan::NewPlan,
    status::Status,
    store::{PersonStore as _, PlanStore as _},
    subscription::Subscription,
  };
  use gym_store_sqlite::SqliteStore;

  use super::*;

  #[test]
  fn next_midnight_is_the_following_day() {
    let now = Utc.with_ymd_and_hms(2024, 2, 28, 13, 45, 0).unwrap();
    assert_eq!(next_midnight(now), Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());

    let midnight = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
    assert_eq!(next_midnight(midnight), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
  }

  #[tokio::test]
  async fn startup_sweep_runs_and_cancel_stops_the_loop() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let owner = store
      .add_person(NewPerson { full_name: "Ivan Petrov".into(), phone: "79991234567".into() })
      .await
      .unwrap();
    let plan = store
      .add_plan(NewPlan {
        title:         "Monthly".into(),
        price:         2500.0,
        duration_days: 30,
        freeze_days:   0,
      })
      .await
      .unwrap();
    // Ended long ago but stored as active.
    store
      .save_subscription(Subscription {
        number:     "old".into(),
        owner_id:   owner.id,
        plan_id:    plan.id,
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date:   NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        status:     Status::Active,
      })
      .await
      .unwrap();

    let store = Arc::new(store);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_scheduler(
      LifecycleService::new(Arc::clone(&store)),
      Duration::from_secs(86_400),
      true,
      cancel.clone(),
    ));

    let mut status = Status::Active;
    for _ in 0..100 {
      status = store.get_subscription("old").await.unwrap().unwrap().status;
      if status == Status::Expired {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, Status::Expired);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
      .await
      .expect("scheduler did not stop")
      .unwrap();
  }
}
