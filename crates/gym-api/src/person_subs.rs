//! Handlers for `/person_sub` endpoints, all routed through the
//! [`LifecycleService`](gym_core::lifecycle::LifecycleService).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/person_sub` | All subscriptions, by number |
//! | `GET`    | `/person_sub/find/{number}` | 404 if not found |
//! | `GET`    | `/person_sub/find?name=` | Subscriptions of the person with that full name |
//! | `POST`   | `/person_sub/add` | Body: [`SubscriptionForm`], number trimmed; 201 + `{"number": ...}` |
//! | `DELETE` | `/person_sub/delete/{number}` | 204; 404 if not found |
//! | `POST`   | `/person_sub/sweep` | Re-derive every status now; returns the report, 409 while a sweep runs |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  store::GymStore,
  subscription::{SubscriptionForm, SubscriptionView},
  sweep::SweepReport,
};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiState, error::ApiError};

/// `GET /person_sub`
pub async fn list<S: GymStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
  Ok(Json(state.subscriptions.list_all().await?))
}

/// `GET /person_sub/find/{number}`
pub async fn get_one<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(number): Path<String>,
) -> Result<Json<SubscriptionView>, ApiError> {
  Ok(Json(state.subscriptions.get_by_number(&number).await?))
}

#[derive(Debug, Deserialize)]
pub struct OwnerParams {
  pub name: String,
}

/// `GET /person_sub/find?name=<full name>`
pub async fn find_by_owner<S: GymStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<OwnerParams>,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
  let found = state
    .subscriptions
    .find_by_owner_name(params.name.trim())
    .await?;
  Ok(Json(found))
}

/// `POST /person_sub/add`
pub async fn create<S: GymStore>(
  State(state): State<ApiState<S>>,
  Json(mut form): Json<SubscriptionForm>,
) -> Result<impl IntoResponse, ApiError> {
  form.number = form.number.trim().to_owned();
  if form.number.is_empty() {
    return Err(ApiError::BadRequest("subscription number is required".into()));
  }
  let number = state.subscriptions.add(form).await?;
  Ok((StatusCode::CREATED, Json(json!({ "number": number }))))
}

/// `DELETE /person_sub/delete/{number}`
pub async fn remove<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(number): Path<String>,
) -> Result<StatusCode, ApiError> {
  state.subscriptions.delete(&number).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /person_sub/sweep`
pub async fn sweep_now<S: GymStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<SweepReport>, ApiError> {
  let today = state.subscriptions.today();
  let report = state
    .subscriptions
    .run_status_sweep(today, &state.shutdown)
    .await?;
  Ok(Json(report))
}
