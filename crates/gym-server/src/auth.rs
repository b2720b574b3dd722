//! HTTP Basic authentication against the configured accounts, and the
//! middleware that enforces roles on the API.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;

use crate::error::Error;

/// What an authenticated account may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Read-only access.
  User,
  /// Read and write access, including on-demand sweeps.
  Admin,
}

/// One login accepted by this server instance.
#[derive(Clone, Deserialize)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone, Default)]
pub struct AuthConfig {
  pub accounts: Vec<Account>,
}

/// Verify Basic credentials from `headers` and return the account's role.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Role, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let account = config
    .accounts
    .iter()
    .find(|a| a.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(account.role)
}

/// Methods that only admins may use.
fn mutates(method: &Method) -> bool {
  !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Middleware: any account may read, only admins may write.
pub async fn require_account(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  let role = verify_auth(req.headers(), &auth).inspect_err(|_| {
    tracing::debug!(uri = %req.uri(), "rejected credentials");
  })?;
  if mutates(req.method()) && role != Role::Admin {
    tracing::warn!(method = %req.method(), uri = %req.uri(), "write attempted without admin role");
    return Err(Error::Forbidden);
  }
  Ok(next.run(req).await)
}
