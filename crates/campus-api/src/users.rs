//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/{id}` | Admin or the account itself |
//! | `PUT`  | `/users/{id}/status` | Admin; body `{"status":"Inactive"}` |

use axum::{
  Json,
  extract::{Path, State},
};
use campus_core::{
  account::{AccountId, Status, UserRecord},
  directory::IdentityDirectory,
  store::DocumentStore,
  users,
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError};

pub async fn get_one<D, S>(
  State(state): State<AppState<D, S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<Json<UserRecord>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let id = AccountId::new(id);
  caller.require_self_or_admin(&id)?;
  Ok(Json(users::load_user(state.store.as_ref(), &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: Status,
}

pub async fn set_status<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<UserRecord>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let record =
    users::set_status(state.store.as_ref(), &actor, &AccountId::new(id), body.status).await?;
  Ok(Json(record))
}
