//! Error type for `campus-store-sqlite`.

use campus_core::{DirectoryError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("password hash error: {0}")]
  PasswordHash(String),

  /// A stored document body is not a JSON object.
  #[error("document {0} is not an object")]
  NotAnObject(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for StoreError {
  fn from(e: Error) -> Self { StoreError::backend(e) }
}

impl From<Error> for DirectoryError {
  fn from(e: Error) -> Self { DirectoryError::backend(e) }
}
