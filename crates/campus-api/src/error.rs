//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use campus_core::{Error, ProvisionError, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Well-formed input the domain refuses (weak password, bad assignment).
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  /// A provisioning rollback left state behind.
  #[error("{message}")]
  CleanupRequired {
    message:    String,
    account_id: String,
    email:      String,
    leftovers:  Vec<String>,
  },

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    let message = e.to_string();
    match e {
      Error::UserNotFound(_)
      | Error::TeacherProfileNotFound(_)
      | Error::StudentNotFound(_)
      | Error::AssignmentNotFound(_)
      | Error::AppraisalNotFound(_)
      | Error::Store(StoreError::NotFound(_)) => Self::NotFound(message),

      Error::Forbidden { .. } | Error::OutOfScope { .. } => Self::Forbidden(message),

      Error::StaleVisibilityInput(_)
      | Error::AppraisalTransitionConflict { .. }
      | Error::AppraisalNotProcessed(_)
      | Error::DuplicateRemark { .. }
      | Error::Store(StoreError::AlreadyExists(_)) => Self::Conflict(message),

      Error::NotATeacher(_)
      | Error::InvalidAssignmentConfiguration(_)
      | Error::InvalidMonth(_)
      | Error::MissingSubject => Self::Unprocessable(message),

      Error::Store(_) | Error::Directory(_) => Self::Internal(message),
    }
  }
}

impl From<ProvisionError> for ApiError {
  fn from(e: ProvisionError) -> Self {
    let message = e.to_string();
    match e {
      ProvisionError::DuplicateIdentity { .. } => Self::Conflict(message),
      ProvisionError::WeakCredential(_)
      | ProvisionError::InvalidIdentity(_)
      | ProvisionError::InvalidProfile(_) => Self::Unprocessable(message),
      ProvisionError::ManualCleanupRequired { account_id, email, leftovers, .. } => {
        Self::CleanupRequired {
          message,
          account_id: account_id.to_string(),
          email,
          leftovers: leftovers.iter().map(ToString::to_string).collect(),
        }
      }
      ProvisionError::DocumentWriteFailed { .. } | ProvisionError::Unknown(_) => {
        Self::Internal(message)
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"campus\""),
        );
        return res;
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": m })),
      ApiError::CleanupRequired { message, account_id, email, leftovers } => {
        tracing::error!(account = %account_id, %email, ?leftovers, "manual cleanup required");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({
            "error": message,
            "accountId": account_id,
            "email": email,
            "leftovers": leftovers,
          }),
        )
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": m }))
      }
    };
    (status, Json(body)).into_response()
  }
}
