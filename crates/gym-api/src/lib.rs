//! JSON REST API for the gym backend.
//!
//! Exposes an axum [`Router`] backed by any [`gym_core::store::GymStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", gym_api::api_router(state))
//! ```

pub mod error;
pub mod people;
pub mod person_subs;
pub mod plans;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use gym_core::{lifecycle::LifecycleService, store::GymStore};
use tokio_util::sync::CancellationToken;

pub use error::ApiError;

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub subscriptions: LifecycleService<S>,
  /// Fired at shutdown; an on-demand sweep stops at the next record.
  pub shutdown:      CancellationToken,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      subscriptions: self.subscriptions.clone(),
      shutdown:      self.shutdown.clone(),
    }
  }
}

impl<S: GymStore> ApiState<S> {
  pub fn new(subscriptions: LifecycleService<S>, shutdown: CancellationToken) -> Self {
    Self { subscriptions, shutdown }
  }

  pub fn store(&self) -> &S { self.subscriptions.store() }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: GymStore + 'static,
{
  Router::new()
    // People
    .route("/people", get(people::list::<S>))
    .route("/people/find", get(people::find::<S>))
    .route("/people/add", post(people::create::<S>))
    .route("/people/update/{id}", put(people::update::<S>))
    .route("/people/delete/{id}", delete(people::remove::<S>))
    // Plans
    .route("/subscription", get(plans::list::<S>))
    .route("/subscription/add", post(plans::create::<S>))
    .route("/subscription/update/{id}", put(plans::update::<S>))
    .route("/subscription/delete/{id}", delete(plans::remove::<S>))
    // Person subscriptions
    .route("/person_sub", get(person_subs::list::<S>))
    .route("/person_sub/find", get(person_subs::find_by_owner::<S>))
    .route("/person_sub/find/{number}", get(person_subs::get_one::<S>))
    .route("/person_sub/add", post(person_subs::create::<S>))
    .route("/person_sub/delete/{number}", delete(person_subs::remove::<S>))
    .route("/person_sub/sweep", post(person_subs::sweep_now::<S>))
    .with_state(state)
}
