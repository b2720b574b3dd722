//! API error type and [`axum::response::IntoResponse`] implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gym_core::store::{Reference, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Per-field validation messages.
  #[error("invalid {0}")]
  Invalid(&'static str, BTreeMap<&'static str, String>),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Details are logged, never sent to the client.
  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Internal(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Invalid(what, fields) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": format!("invalid {what}"), "fields": fields }),
      ),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({ "error": "internal server error" }),
        )
      }
    };
    (status, Json(body)).into_response()
  }
}

impl From<gym_core::Error> for ApiError {
  fn from(e: gym_core::Error) -> Self {
    use gym_core::Error as E;
    match e {
      E::SubscriptionAlreadyExists(_) | E::SweepInProgress => ApiError::Conflict(e.to_string()),
      E::SubscriptionNotFound(_) | E::OwnerNotFound(_) | E::PlanNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      E::InvalidDateRange { .. } => ApiError::BadRequest(e.to_string()),
      E::Storage { .. } => ApiError::internal(e),
    }
  }
}

/// Fallback for store failures the handler did not classify itself.
impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::DuplicateKey => ApiError::Conflict("record already exists".into()),
      StoreError::StillReferenced => {
        ApiError::Conflict("record is still referenced by a subscription".into())
      }
      StoreError::MissingReference(Reference::Owner) => {
        ApiError::NotFound("person not found".into())
      }
      StoreError::MissingReference(Reference::Plan) => {
        ApiError::NotFound("plan not found".into())
      }
      StoreError::Other(_) => ApiError::internal(e),
    }
  }
}
