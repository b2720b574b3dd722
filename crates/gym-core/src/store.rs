//! Store traits and the error type shared by all storage backends.
//!
//! The traits are implemented by storage backends (e.g. `gym-store-sqlite`).
//! Higher layers (`gym-api`, `gym-server`) depend on this abstraction, not on
//! any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use thiserror::Error;

use crate::{
  person::{NewPerson, Person},
  plan::{NewPlan, Plan},
  status::Status,
  subscription::Subscription,
};

// ─── Error ───────────────────────────────────────────────────────────────────

/// Which foreign key a write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
  Owner,
  Plan,
}

/// Failure classes a backend must tell apart. Anything the backend cannot
/// classify is carried opaquely in [`StoreError::Other`].
#[derive(Debug, Error)]
pub enum StoreError {
  /// A unique key (primary key or unique index) already exists.
  #[error("duplicate key")]
  DuplicateKey,

  /// A foreign key points at a row that does not exist.
  #[error("missing {0:?} reference")]
  MissingReference(Reference),

  /// The row is still referenced by another table and cannot be removed.
  #[error("row is still referenced")]
  StillReferenced,

  #[error(transparent)]
  Other(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
  pub fn other(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Other(Box::new(e))
  }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// Persistence of subscription records, keyed by `number`.
pub trait SubscriptionStore: Send + Sync {
  /// Insert a new record and return its key.
  ///
  /// Fails with [`StoreError::DuplicateKey`] if `number` is taken and with
  /// [`StoreError::MissingReference`] if the owner or plan does not exist.
  fn save_subscription(
    &self,
    record: Subscription,
  ) -> impl Future<Output = StoreResult<String>> + Send + '_;

  /// Retrieve a record by key. Returns `None` if not found.
  fn get_subscription<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = StoreResult<Option<Subscription>>> + Send + 'a;

  /// Every record in the store.
  fn list_subscriptions(
    &self,
  ) -> impl Future<Output = StoreResult<Vec<Subscription>>> + Send + '_;

  /// Records whose owner's full name equals `name` exactly.
  fn find_subscriptions_by_owner_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = StoreResult<Vec<Subscription>>> + Send + 'a;

  /// Delete by key and return the number of rows removed (0 or 1).
  fn delete_subscription<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = StoreResult<u64>> + Send + 'a;

  /// Overwrite the status of one record and return the number of rows
  /// changed (0 or 1).
  fn update_subscription_status<'a>(
    &'a self,
    number: &'a str,
    status: Status,
  ) -> impl Future<Output = StoreResult<u64>> + Send + 'a;
}

// ─── People ──────────────────────────────────────────────────────────────────

pub trait PersonStore: Send + Sync {
  /// Fails with [`StoreError::DuplicateKey`] when a person with the same name
  /// and phone already exists.
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = StoreResult<Person>> + Send + '_;

  fn list_people(&self) -> impl Future<Output = StoreResult<Vec<Person>>> + Send + '_;

  /// Look a person up by exact full name. Returns `None` if not found.
  fn find_person_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = StoreResult<Option<Person>>> + Send + 'a;

  /// Replace a person's fields. Returns `None` if `id` does not exist.
  fn update_person(
    &self,
    id: i64,
    input: NewPerson,
  ) -> impl Future<Output = StoreResult<Option<Person>>> + Send + '_;

  /// Returns the number of rows removed (0 or 1).
  fn delete_person(&self, id: i64) -> impl Future<Output = StoreResult<u64>> + Send + '_;
}

// ─── Plans ───────────────────────────────────────────────────────────────────

pub trait PlanStore: Send + Sync {
  fn add_plan(&self, input: NewPlan) -> impl Future<Output = StoreResult<Plan>> + Send + '_;

  fn list_plans(&self) -> impl Future<Output = StoreResult<Vec<Plan>>> + Send + '_;

  /// Replace a plan's fields. Returns `None` if `id` does not exist.
  fn update_plan(
    &self,
    id: i64,
    input: NewPlan,
  ) -> impl Future<Output = StoreResult<Option<Plan>>> + Send + '_;

  /// Returns the number of rows removed (0 or 1). Fails with
  /// [`StoreError::StillReferenced`] while subscriptions use the plan.
  fn delete_plan(&self, id: i64) -> impl Future<Output = StoreResult<u64>> + Send + '_;
}

/// Everything the HTTP layer needs from one backend.
pub trait GymStore: SubscriptionStore + PersonStore + PlanStore {}

impl<T> GymStore for T where T: SubscriptionStore + PersonStore + PlanStore {}
