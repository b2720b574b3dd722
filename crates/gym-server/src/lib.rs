//! HTTP server for the gym backend.
//!
//! Wraps the [`gym_api`] router with Basic authentication and request
//! tracing, and provides the background status sweep scheduler.

pub mod auth;
pub mod error;
pub mod schedule;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use gym_api::{ApiState, api_router};
use gym_core::store::GymStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{Account, AuthConfig, require_account};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `GYM_*`
/// environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Seconds between scheduled sweeps; the first one runs at UTC midnight.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
  #[serde(default = "default_sweep_on_startup")]
  pub sweep_on_startup:    bool,
  #[serde(default)]
  pub accounts:            Vec<Account>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("gym.sqlite3") }
fn default_sweep_interval_secs() -> u64 { 86_400 }
fn default_sweep_on_startup() -> bool { true }

impl ServerConfig {
  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs) }

  pub fn auth(&self) -> AuthConfig { AuthConfig { accounts: self.accounts.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the API under `/api/v1`, behind
/// authentication, with every request traced.
pub fn router<S>(state: ApiState<S>, auth: Arc<AuthConfig>) -> Router
where
  S: GymStore + 'static,
{
  let api = api_router(state).layer(middleware::from_fn_with_state(auth, require_account));

  Router::new()
    .nest("/api/v1", api)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
  };
  use gym_core::lifecycle::LifecycleService;
  use gym_store_sqlite::SqliteStore;
  use serde_json::json;
  use tokio_util::sync::CancellationToken;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::tests::{basic, config};

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = ApiState::new(LifecycleService::new(Arc::new(store)), CancellationToken::new());
    router(state, Arc::new(config()))
  }

  /// POSTs carry a valid new-person body.
  fn request(method: Method, uri: &str, auth: Option<&str>) -> Request<Body> {
    let with_body = method == Method::POST;
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = auth {
      builder = builder.header(header::AUTHORIZATION, a);
    }
    if with_body {
      builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
          json!({ "full_name": "Ivan Petrov", "phone": "79991234567" }).to_string(),
        ))
        .unwrap()
    } else {
      builder.body(Body::empty()).unwrap()
    }
  }

  #[tokio::test]
  async fn anonymous_requests_are_challenged() {
    let res = app().await.oneshot(request(Method::GET, "/api/v1/people", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Basic realm=\"gym\""
    );
  }

  #[tokio::test]
  async fn users_read_but_do_not_write() {
    let app = app().await;
    let clerk = basic("clerk", "secret");

    let res = app
      .clone()
      .oneshot(request(Method::GET, "/api/v1/people", Some(&clerk)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
      .oneshot(request(Method::POST, "/api/v1/people/add", Some(&clerk)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn admins_write() {
    let boss = basic("boss", "secret");
    let res = app()
      .await
      .oneshot(request(Method::POST, "/api/v1/people/add", Some(&boss)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
  }

  #[test]
  fn config_defaults_apply() {
    let cfg: ServerConfig = ::config::Config::builder()
      .set_override("port", 9000)
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.sweep_interval(), Duration::from_secs(86_400));
    assert!(cfg.sweep_on_startup);
    assert!(cfg.accounts.is_empty());
  }
}
