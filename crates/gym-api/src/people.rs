//! Handlers for `/people` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/people` | All people, by id |
//! | `GET`    | `/people/find?name=` | Exact full-name match; 404 if absent |
//! | `POST`   | `/people/add` | Body: [`NewPerson`]; 201, 409 on a duplicate |
//! | `PUT`    | `/people/update/{id}` | Body: [`NewPerson`]; 404 / 409 |
//! | `DELETE` | `/people/delete/{id}` | 204; 404, or 409 while subscriptions exist |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  person::{NewPerson, Person},
  store::{GymStore, StoreError},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

fn validated(input: NewPerson) -> Result<NewPerson, ApiError> {
  let errors = input.validate();
  if errors.is_empty() {
    Ok(NewPerson { full_name: input.full_name.trim().to_owned(), phone: input.phone })
  } else {
    Err(ApiError::Invalid("person", errors))
  }
}

/// The returned closure owns its message, so `input` can be moved right after.
fn duplicate(input: &NewPerson) -> impl FnOnce(StoreError) -> ApiError + use<> {
  let message = format!(
    "person {:?} with phone {} already exists",
    input.full_name, input.phone
  );
  move |e| match e {
    StoreError::DuplicateKey => ApiError::Conflict(message),
    other => other.into(),
  }
}

// ─── List / find ─────────────────────────────────────────────────────────────

/// `GET /people`
pub async fn list<S: GymStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Person>>, ApiError> {
  Ok(Json(state.store().list_people().await?))
}

#[derive(Debug, Deserialize)]
pub struct FindParams {
  pub name: String,
}

/// `GET /people/find?name=<full name>`
pub async fn find<S: GymStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<FindParams>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store()
    .find_person_by_name(params.name.trim())
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("person {:?} not found", params.name)))?;
  Ok(Json(person))
}

// ─── Create / update ─────────────────────────────────────────────────────────

/// `POST /people/add`
pub async fn create<S: GymStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewPerson>,
) -> Result<impl IntoResponse, ApiError> {
  let input = validated(body)?;
  let on_err = duplicate(&input);
  let person = state.store().add_person(input).await.map_err(on_err)?;
  tracing::info!(id = person.id, "person added");
  Ok((StatusCode::CREATED, Json(person)))
}

/// `PUT /people/update/{id}`
pub async fn update<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewPerson>,
) -> Result<Json<Person>, ApiError> {
  let input = validated(body)?;
  let on_err = duplicate(&input);
  let person = state
    .store()
    .update_person(id, input)
    .await
    .map_err(on_err)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  Ok(Json(person))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /people/delete/{id}`
pub async fn remove<S: GymStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  let removed = state.store().delete_person(id).await.map_err(|e| match e {
    StoreError::StillReferenced => {
      ApiError::Conflict(format!("person {id} still owns subscriptions"))
    }
    other => other.into(),
  })?;
  if removed == 0 {
    return Err(ApiError::NotFound(format!("person {id} not found")));
  }
  tracing::info!(id, "person deleted");
  Ok(StatusCode::NO_CONTENT)
}
