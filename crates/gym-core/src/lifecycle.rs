//! [`LifecycleService`]: the orchestration layer for person subscriptions.
//!
//! The service converts between wire records (string dates) and stored
//! records, applies the creation-day defaults, derives the initial status and
//! classifies store failures into [`Error`]. It holds no mutable state; all
//! consistency guarantees come from the store.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, Span, error, info, info_span, warn};

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
  status::Status,
  store::{Reference, StoreError, SubscriptionStore},
  subscription::{
    DEFAULT_DURATION, Subscription, SubscriptionForm, SubscriptionView, parse_wire_date,
  },
  sweep::{SweepReport, sweep},
};

/// Add/get/list/delete person subscriptions and run status sweeps.
///
/// Every operation runs in a child span of the span given at construction,
/// so callers decide where the service's logs are attached.
///
/// Clones share one sweep lock, so at most one sweep runs at a time no
/// matter which clone starts it.
pub struct LifecycleService<S> {
  store:    Arc<S>,
  clock:    Arc<dyn Clock>,
  span:     Span,
  sweeping: Arc<Mutex<()>>,
}

impl<S> Clone for LifecycleService<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      clock:    Arc::clone(&self.clock),
      span:     self.span.clone(),
      sweeping: Arc::clone(&self.sweeping),
    }
  }
}

impl<S: SubscriptionStore> LifecycleService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      clock: Arc::new(SystemClock),
      span: info_span!("subscriptions"),
      sweeping: Arc::new(Mutex::new(())),
    }
  }

  /// Replace the wall clock, e.g. with a [`FixedClock`](crate::clock::FixedClock).
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Attach the service's logs to `span`.
  pub fn with_span(mut self, span: Span) -> Self {
    self.span = span;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// The day the service currently considers "today".
  pub fn today(&self) -> NaiveDate { self.clock.today() }

  /// Create a subscription from a wire form and return its number.
  ///
  /// Missing or malformed dates default to today (start) and start + 30 days
  /// (end). Without an explicit status the record gets
  /// [`Status::derive`] of its range as of today.
  pub async fn add(&self, form: SubscriptionForm) -> Result<String> {
    let span = info_span!(parent: &self.span, "add", number = %form.number);
    async move {
      info!("adding subscription");

      let record = build_record(form, self.today())?;
      let (number, owner_id, plan_id) =
        (record.number.clone(), record.owner_id, record.plan_id);

      match self.store.save_subscription(record).await {
        Ok(number) => {
          info!("subscription added");
          Ok(number)
        }
        Err(StoreError::DuplicateKey) => {
          warn!("subscription already exists");
          Err(Error::SubscriptionAlreadyExists(number))
        }
        Err(StoreError::MissingReference(Reference::Owner)) => {
          warn!(owner_id, "owner not found");
          Err(Error::OwnerNotFound(owner_id))
        }
        Err(StoreError::MissingReference(Reference::Plan)) => {
          warn!(plan_id, "plan not found");
          Err(Error::PlanNotFound(plan_id))
        }
        Err(e @ (StoreError::StillReferenced | StoreError::Other(_))) => {
          error!(error = %e, "failed to add subscription");
          Err(Error::Storage { op: "add subscription", source: e })
        }
      }
    }
    .instrument(span)
    .await
  }

  /// Fetch one subscription by its number.
  pub async fn get_by_number(&self, number: &str) -> Result<SubscriptionView> {
    let span = info_span!(parent: &self.span, "get_by_number", number);
    async move {
      let record = self
        .store
        .get_subscription(number)
        .await
        .map_err(Error::storage("get subscription"))?
        .ok_or_else(|| Error::SubscriptionNotFound(number.to_owned()))?;
      Ok(SubscriptionView::from(record))
    }
    .instrument(span)
    .await
  }

  pub async fn list_all(&self) -> Result<Vec<SubscriptionView>> {
    let span = info_span!(parent: &self.span, "list_all");
    async move {
      let records = self
        .store
        .list_subscriptions()
        .await
        .map_err(Error::storage("list subscriptions"))?;
      info!(count = records.len(), "subscriptions listed");
      Ok(records.into_iter().map(SubscriptionView::from).collect())
    }
    .instrument(span)
    .await
  }

  /// Subscriptions owned by the person whose full name is exactly `name`.
  pub async fn find_by_owner_name(&self, name: &str) -> Result<Vec<SubscriptionView>> {
    let span = info_span!(parent: &self.span, "find_by_owner_name", name);
    async move {
      let records = self
        .store
        .find_subscriptions_by_owner_name(name)
        .await
        .map_err(Error::storage("find subscriptions by owner name"))?;
      info!(count = records.len(), "subscriptions found");
      Ok(records.into_iter().map(SubscriptionView::from).collect())
    }
    .instrument(span)
    .await
  }

  pub async fn delete(&self, number: &str) -> Result<()> {
    let span = info_span!(parent: &self.span, "delete", number);
    async move {
      let affected = self
        .store
        .delete_subscription(number)
        .await
        .map_err(Error::storage("delete subscription"))?;
      if affected == 0 {
        warn!("subscription not found");
        return Err(Error::SubscriptionNotFound(number.to_owned()));
      }
      info!("subscription deleted");
      Ok(())
    }
    .instrument(span)
    .await
  }

  /// Re-derive and persist the status of every subscription as of `today`.
  ///
  /// Fails with [`Error::SweepInProgress`] instead of waiting when another
  /// sweep is running.
  pub async fn run_status_sweep(
    &self,
    today: NaiveDate,
    cancel: &CancellationToken,
  ) -> Result<SweepReport> {
    let span = info_span!(parent: &self.span, "sweep", %today);
    async move {
      let Ok(_guard) = self.sweeping.try_lock() else {
        warn!("sweep already running");
        return Err(Error::SweepInProgress);
      };
      info!("sweeping subscription statuses");
      let report = sweep(&*self.store, today, cancel).await?;
      info!(
        examined = report.examined,
        updated = report.updated,
        skipped = report.skipped,
        cancelled = report.cancelled,
        "sweep finished"
      );
      Ok(report)
    }
    .instrument(span)
    .await
  }
}

/// Turn a wire form into a record, applying the creation-day defaults.
fn build_record(form: SubscriptionForm, today: NaiveDate) -> Result<Subscription> {
  let start_date = form
    .start_date
    .as_deref()
    .and_then(parse_wire_date)
    .unwrap_or(today);
  let end_date = form
    .end_date
    .as_deref()
    .and_then(parse_wire_date)
    .unwrap_or_else(|| {
      start_date
        .checked_add_days(DEFAULT_DURATION)
        .unwrap_or(NaiveDate::MAX)
    });

  if end_date < start_date {
    return Err(Error::InvalidDateRange { start: start_date, end: end_date });
  }

  let status = form
    .status
    .unwrap_or_else(|| Status::derive(start_date, end_date, today));

  Ok(Subscription {
    number: form.number,
    owner_id: form.owner_id,
    plan_id: form.plan_id,
    start_date,
    end_date,
    status,
  })
}

#[cfg(test)]
mod tests {
  use std::{
    collections::BTreeMap,
    sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use chrono::Days;
  use tokio::sync::Semaphore;

  use super::*;
  use crate::{clock::FixedClock, store::StoreResult};

  // ─── In-memory store ─────────────────────────────────────────────────────

  /// Owners and plans are plain id lists; `fail_updates` makes every status
  /// update fail and `vanished` numbers report zero affected rows. With a
  /// `gate`, each status update waits for one permit.
  #[derive(Default)]
  struct MemStore {
    records:        Mutex<BTreeMap<String, Subscription>>,
    owners:         Vec<(i64, &'static str)>,
    plans:          Vec<i64>,
    status_updates: AtomicUsize,
    fail_updates:   bool,
    vanished:       Vec<&'static str>,
    gate:           Option<Arc<Semaphore>>,
  }

  impl MemStore {
    fn new() -> Self {
      Self {
        owners: vec![(1, "Ivan Petrov"), (2, "Anna Smirnova")],
        plans: vec![10],
        ..Default::default()
      }
    }

    fn insert(&self, record: Subscription) {
      self.records.lock().unwrap().insert(record.number.clone(), record);
    }

    fn status_of(&self, number: &str) -> Status {
      self.records.lock().unwrap()[number].status
    }

    fn updates(&self) -> usize { self.status_updates.load(Ordering::SeqCst) }
  }

  impl SubscriptionStore for MemStore {
    async fn save_subscription(&self, record: Subscription) -> StoreResult<String> {
      if !self.owners.iter().any(|(id, _)| *id == record.owner_id) {
        return Err(StoreError::MissingReference(Reference::Owner));
      }
      if !self.plans.contains(&record.plan_id) {
        return Err(StoreError::MissingReference(Reference::Plan));
      }
      let mut records = self.records.lock().unwrap();
      if records.contains_key(&record.number) {
        return Err(StoreError::DuplicateKey);
      }
      let number = record.number.clone();
      records.insert(number.clone(), record);
      Ok(number)
    }

    async fn get_subscription(&self, number: &str) -> StoreResult<Option<Subscription>> {
      Ok(self.records.lock().unwrap().get(number).cloned())
    }

    async fn list_subscriptions(&self) -> StoreResult<Vec<Subscription>> {
      Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn find_subscriptions_by_owner_name(
      &self,
      name: &str,
    ) -> StoreResult<Vec<Subscription>> {
      let ids: Vec<i64> = self
        .owners
        .iter()
        .filter(|(_, n)| *n == name)
        .map(|(id, _)| *id)
        .collect();
      Ok(
        self
          .records
          .lock()
          .unwrap()
          .values()
          .filter(|r| ids.contains(&r.owner_id))
          .cloned()
          .collect(),
      )
    }

    async fn delete_subscription(&self, number: &str) -> StoreResult<u64> {
      Ok(self.records.lock().unwrap().remove(number).map_or(0, |_| 1))
    }

    async fn update_subscription_status(
      &self,
      number: &str,
      status: Status,
    ) -> StoreResult<u64> {
      self.status_updates.fetch_add(1, Ordering::SeqCst);
      if let Some(gate) = &self.gate {
        gate.acquire().await.unwrap().forget();
      }
      if self.fail_updates {
        return Err(StoreError::other(std::io::Error::other("disk full")));
      }
      if self.vanished.iter().any(|v| *v == number) {
        return Ok(0);
      }
      let mut records = self.records.lock().unwrap();
      match records.get_mut(number) {
        Some(r) => {
          r.status = status;
          Ok(1)
        }
        None => Ok(0),
      }
    }
  }

  // ─── Helpers ─────────────────────────────────────────────────────────────

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn today() -> NaiveDate { d(2024, 3, 15) }

  fn service(store: MemStore) -> LifecycleService<MemStore> {
    LifecycleService::new(Arc::new(store)).with_clock(FixedClock(today()))
  }

  fn form(number: &str, start: &str, end: &str) -> SubscriptionForm {
    SubscriptionForm {
      number: number.into(),
      owner_id: 1,
      plan_id: 10,
      start_date: Some(start.into()),
      end_date: Some(end.into()),
      status: None,
    }
  }

  fn record(number: &str, start: NaiveDate, end: NaiveDate, status: Status) -> Subscription {
    Subscription {
      number: number.into(),
      owner_id: 1,
      plan_id: 10,
      start_date: start,
      end_date: end,
      status,
    }
  }

  // ─── add / get ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn add_then_get_round_trips_wire_dates() {
    let svc = service(MemStore::new());

    let number = svc.add(form("A-1", "01-01-2024", "31-01-2024")).await.unwrap();
    assert_eq!(number, "A-1");

    let view = svc.get_by_number("A-1").await.unwrap();
    assert_eq!(view.start_date, "01-01-2024");
    assert_eq!(view.end_date, "31-01-2024");
    assert_eq!(view.owner_id, 1);
    assert_eq!(view.plan_id, 10);
  }

  #[tokio::test]
  async fn empty_dates_default_to_today_and_thirty_days() {
    let svc = service(MemStore::new());
    svc.add(form("A-1", "", "")).await.unwrap();

    let stored = svc.store().get_subscription("A-1").await.unwrap().unwrap();
    assert_eq!(stored.start_date, today());
    assert_eq!(stored.end_date, today() + Days::new(30));
    assert_eq!(stored.status, Status::Active);
  }

  #[tokio::test]
  async fn absent_and_malformed_dates_use_defaults() {
    let svc = service(MemStore::new());
    let mut f = form("A-1", "2024-03-20", "garbage");
    f.start_date = None;
    svc.add(f).await.unwrap();
    svc.add(form("A-2", "2024-03-20", "20/04/2024")).await.unwrap();

    for number in ["A-1", "A-2"] {
      let stored = svc.store().get_subscription(number).await.unwrap().unwrap();
      assert_eq!(stored.start_date, today(), "{number}");
      assert_eq!(stored.end_date, d(2024, 4, 14), "{number}");
    }
  }

  #[tokio::test]
  async fn end_date_defaults_relative_to_given_start() {
    let svc = service(MemStore::new());
    svc.add(form("A-1", "01-04-2024", "")).await.unwrap();

    let stored = svc.store().get_subscription("A-1").await.unwrap().unwrap();
    assert_eq!(stored.end_date, d(2024, 5, 1));
    assert_eq!(stored.status, Status::Frozen);
  }

  #[tokio::test]
  async fn initial_status_uses_the_full_date_range() {
    let svc = service(MemStore::new());
    svc.add(form("past-open", "01-03-2024", "31-03-2024")).await.unwrap();
    svc.add(form("past-closed", "01-01-2024", "31-01-2024")).await.unwrap();
    svc.add(form("future", "01-04-2024", "30-04-2024")).await.unwrap();

    assert_eq!(svc.store().status_of("past-open"), Status::Active);
    assert_eq!(svc.store().status_of("past-closed"), Status::Expired);
    assert_eq!(svc.store().status_of("future"), Status::Frozen);
  }

  #[tokio::test]
  async fn explicit_status_is_kept() {
    let svc = service(MemStore::new());
    let mut f = form("A-1", "01-03-2024", "31-03-2024");
    f.status = Some(Status::Frozen);
    svc.add(f).await.unwrap();

    assert_eq!(svc.store().status_of("A-1"), Status::Frozen);
  }

  #[tokio::test]
  async fn duplicate_number_is_a_conflict() {
    let svc = service(MemStore::new());
    svc.add(form("A-1", "", "")).await.unwrap();

    let err = svc.add(form("A-1", "", "")).await.unwrap_err();
    assert!(matches!(err, Error::SubscriptionAlreadyExists(ref n) if n == "A-1"));
  }

  #[tokio::test]
  async fn dangling_references_are_classified() {
    let svc = service(MemStore::new());

    let mut f = form("A-1", "", "");
    f.owner_id = 99;
    assert!(matches!(svc.add(f).await, Err(Error::OwnerNotFound(99))));

    let mut f = form("A-2", "", "");
    f.plan_id = 77;
    assert!(matches!(svc.add(f).await, Err(Error::PlanNotFound(77))));
  }

  #[tokio::test]
  async fn inverted_range_is_rejected() {
    let svc = service(MemStore::new());
    let err = svc.add(form("A-1", "10-03-2024", "01-03-2024")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDateRange { .. }));
    assert!(svc.list_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn get_missing_is_not_found() {
    let svc = service(MemStore::new());
    let err = svc.get_by_number("nope").await.unwrap_err();
    assert!(matches!(err, Error::SubscriptionNotFound(ref n) if n == "nope"));
  }

  // ─── list / find / delete ────────────────────────────────────────────────

  #[tokio::test]
  async fn list_and_find_by_owner_name() {
    let svc = service(MemStore::new());
    svc.add(form("A-1", "", "")).await.unwrap();
    let mut f = form("B-1", "", "");
    f.owner_id = 2;
    svc.add(f).await.unwrap();

    assert_eq!(svc.list_all().await.unwrap().len(), 2);

    let annas = svc.find_by_owner_name("Anna Smirnova").await.unwrap();
    assert_eq!(annas.len(), 1);
    assert_eq!(annas[0].number, "B-1");

    assert!(svc.find_by_owner_name("Nobody").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn delete_missing_is_not_found() {
    let svc = service(MemStore::new());
    let err = svc.delete("nope").await.unwrap_err();
    assert!(matches!(err, Error::SubscriptionNotFound(_)));
  }

  #[tokio::test]
  async fn delete_existing_then_get_fails() {
    let svc = service(MemStore::new());
    svc.add(form("A-1", "", "")).await.unwrap();

    svc.delete("A-1").await.unwrap();
    assert!(matches!(
      svc.get_by_number("A-1").await,
      Err(Error::SubscriptionNotFound(_))
    ));
  }

  // ─── sweep ───────────────────────────────────────────────────────────────

  fn seeded_store() -> MemStore {
    let store = MemStore::new();
    // Three drifted records and one already consistent.
    store.insert(record("stale-active", d(2024, 1, 1), d(2024, 1, 31), Status::Active));
    store.insert(record("stale-frozen", d(2024, 3, 1), d(2024, 3, 31), Status::Frozen));
    store.insert(record("stale-expired", d(2024, 4, 1), d(2024, 4, 30), Status::Expired));
    store.insert(record("consistent", d(2024, 3, 1), d(2024, 3, 31), Status::Active));
    store
  }

  #[tokio::test]
  async fn sweep_updates_only_drifted_records() {
    let svc = service(seeded_store());

    let report = svc
      .run_status_sweep(today(), &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(report.examined, 4);
    assert_eq!(report.updated, 3);
    assert_eq!(svc.store().updates(), 3);
    assert_eq!(svc.store().status_of("stale-active"), Status::Expired);
    assert_eq!(svc.store().status_of("stale-frozen"), Status::Active);
    assert_eq!(svc.store().status_of("stale-expired"), Status::Frozen);
    assert_eq!(svc.store().status_of("consistent"), Status::Active);
  }

  #[tokio::test]
  async fn second_sweep_is_a_no_op() {
    let svc = service(seeded_store());
    let cancel = CancellationToken::new();

    svc.run_status_sweep(today(), &cancel).await.unwrap();
    let report = svc.run_status_sweep(today(), &cancel).await.unwrap();

    assert_eq!(report.updated, 0);
    assert_eq!(svc.store().updates(), 3);
  }

  #[tokio::test]
  async fn sweep_aborts_on_first_update_failure() {
    let mut store = seeded_store();
    store.fail_updates = true;
    let svc = service(store);

    let err = svc
      .run_status_sweep(today(), &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Storage { .. }));
    assert_eq!(svc.store().updates(), 1);
  }

  #[tokio::test]
  async fn cancelled_sweep_stops_at_record_boundary() {
    let svc = service(seeded_store());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = svc.run_status_sweep(today(), &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.examined, 0);
    assert_eq!(svc.store().updates(), 0);
  }

  #[tokio::test]
  async fn vanished_record_is_skipped() {
    let mut store = seeded_store();
    store.vanished = vec!["stale-frozen"];
    let svc = service(store);

    let report = svc
      .run_status_sweep(today(), &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(report.updated, 2);
    assert_eq!(report.skipped, 1);
  }

  #[tokio::test]
  async fn sweep_as_of_a_later_day_expires_records() {
    let svc = service(seeded_store());
    let cancel = CancellationToken::new();
    svc.run_status_sweep(today(), &cancel).await.unwrap();

    let report = svc.run_status_sweep(d(2024, 4, 1), &cancel).await.unwrap();

    // "stale-frozen" and "consistent" end on 31-03; "stale-expired" starts.
    assert_eq!(report.updated, 3);
    assert_eq!(svc.store().status_of("consistent"), Status::Expired);
    assert_eq!(svc.store().status_of("stale-expired"), Status::Active);
  }

  #[tokio::test]
  async fn concurrent_sweep_is_refused_while_one_runs() {
    let gate = Arc::new(Semaphore::new(0));
    let mut store = seeded_store();
    store.gate = Some(Arc::clone(&gate));
    let svc = service(store);

    let first = tokio::spawn({
      let svc = svc.clone();
      async move { svc.run_status_sweep(today(), &CancellationToken::new()).await }
    });
    // Wait until the first sweep is parked inside its first update.
    while svc.store().updates() == 0 {
      tokio::task::yield_now().await;
    }

    let second = svc.run_status_sweep(today(), &CancellationToken::new()).await;
    assert!(matches!(second, Err(Error::SweepInProgress)));

    gate.add_permits(3);
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.updated, 3);
    assert_eq!(svc.store().updates(), 3);

    // The lock is released once the sweep returns.
    let again = svc.run_status_sweep(today(), &CancellationToken::new()).await.unwrap();
    assert_eq!(again.updated, 0);
  }
}
