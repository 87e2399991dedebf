//! `POST /session`: confirm credentials and return the caller's user record.

use axum::{Json, extract::State};
use campus_core::{
  account::UserRecord, directory::IdentityDirectory, store::DocumentStore, users,
};
use tracing::info;

use crate::{AppState, auth::Caller, error::ApiError};

/// Stamps `lastLogin` as a side effect.
pub async fn open<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
) -> Result<Json<UserRecord>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let record = users::record_login(state.store.as_ref(), &actor.account_id).await?;
  info!(account = %actor.account_id, role = %actor.role, "session opened");
  Ok(Json(record))
}
