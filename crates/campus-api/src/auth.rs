//! HTTP Basic-auth extractor resolving the caller to an [`Actor`].
//!
//! Credentials are checked against the identity directory; the role comes
//! from the caller's user record, which must be `Active`.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use campus_core::{
  Error,
  account::{AccountId, Actor, Role, Status},
  credentials::normalize_email,
  directory::IdentityDirectory,
  store::DocumentStore,
  users::load_user,
};

use crate::{AppState, error::ApiError};

/// The authenticated caller of a handler.
pub struct Caller(pub Actor);

impl Caller {
  /// Admins, or the account `id` itself.
  pub fn require_self_or_admin(&self, id: &AccountId) -> Result<(), ApiError> {
    if self.0.role == Role::Admin || self.0.is(id) {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!("{} accounts may only act on themselves", self.0.role)))
    }
  }
}

/// Split a `Basic` authorization header into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((normalize_email(email), password.to_owned()))
}

impl<D, S> FromRequestParts<AppState<D, S>> for Caller
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<D, S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;
    let account_id = state
      .directory
      .authenticate(&email, &password)
      .await
      .map_err(|e| ApiError::Internal(e.to_string()))?
      .ok_or(ApiError::Unauthorized)?;

    let record = match load_user(state.store.as_ref(), &account_id).await {
      Ok(record) => record,
      Err(Error::UserNotFound(_)) => return Err(ApiError::Unauthorized),
      Err(e) => return Err(e.into()),
    };
    if record.status != Status::Active {
      return Err(ApiError::Forbidden(format!("account is {}", record.status)));
    }
    Ok(Caller(Actor::new(account_id, record.role)))
  }
}
