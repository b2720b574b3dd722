//! Error type for `gym-store-sqlite`, and its classification into
//! [`StoreError`].

use gym_core::store::StoreError;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A column held a value that does not decode into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for StoreError {
  fn from(e: Error) -> Self {
    match e {
      Error::Database(db) if is_unique_violation(&db) => StoreError::DuplicateKey,
      other => StoreError::other(other),
    }
  }
}

/// The extended result code of a constraint failure, `None` for any other
/// error.
fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
  match e {
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Some(f.extended_code)
    }
    _ => None,
  }
}

fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(inner)
      if matches!(
        constraint_code(inner),
        Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE)
      )
  )
}

pub(crate) fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
  constraint_code(e) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}
