//! Handlers for the plan endpoints, mounted under `/subscription`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subscription` | All plans, by id |
//! | `POST`   | `/subscription/add` | Body: [`NewPlan`]; 201 |
//! | `PUT`    | `/subscription/update/{id}` | Body: [`NewPlan`]; 404 if absent |
//! | `DELETE` | `/subscription/delete/{id}` | 204; 404, or 409 while in use |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  plan::{NewPlan, Plan},
  store::{GymStore, StoreError},
};

use crate::{ApiState, error::ApiError};

fn validated(input: NewPlan) -> Result<NewPlan, ApiError> {
  match input.validate() {
    None => Ok(input),
    Some(reason) => Err(ApiError::BadRequest(reason.to_owned())),
  }
}

/// `GET /subscription`
pub async fn list<S: GymStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Plan>>, ApiError> {
  Ok(Json(state.store().list_plans().await?))
}

/// `POST /subscription/add`
pub async fn create<S: GymStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewPlan>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = state.store().add_plan(validated(body)?).await?;
  tracing::info!(id = plan.id, title = %plan.title, "plan added");
  Ok((StatusCode::CREATED, Json(plan)))
}

/// `PUT /subscription/update/{id}`
pub async fn update<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewPlan>,
) -> Result<Json<Plan>, ApiError> {
  let plan = state
    .store()
    .update_plan(id, validated(body)?)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("plan {id} not found")))?;
  Ok(Json(plan))
}

/// `DELETE /subscription/delete/{id}`
pub async fn remove<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  let removed = state.store().delete_plan(id).await.map_err(|e| match e {
    StoreError::StillReferenced => {
      ApiError::Conflict(format!("plan {id} is used by existing subscriptions"))
    }
    other => other.into(),
  })?;
  if removed == 0 {
    return Err(ApiError::NotFound(format!("plan {id} not found")));
  }
  tracing::info!(id, "plan deleted");
  Ok(StatusCode::NO_CONTENT)
}
