//! Handlers for a teacher's assignments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/teachers/{id}/assignments` | Admin or the teacher |
//! | `POST`   | `/teachers/{id}/assignments` | Admin; adds one |
//! | `PUT`    | `/teachers/{id}/assignments` | Admin; replaces the list atomically |
//! | `PUT`    | `/teachers/{id}/assignments/{aid}` | Admin |
//! | `DELETE` | `/teachers/{id}/assignments/{aid}` | Admin |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  account::{AccountId, Role},
  assignment::{Assignment, NewAssignment},
  directory::IdentityDirectory,
  store::DocumentStore,
};

use crate::{AppState, auth::Caller, error::ApiError};

const ACTION: &str = "manage assignments";

pub async fn list<D, S>(
  State(state): State<AppState<D, S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<Json<Vec<Assignment>>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let teacher = AccountId::new(id);
  caller.require_self_or_admin(&teacher)?;
  Ok(Json(state.assignments.list(&teacher).await?))
}

pub async fn create<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
  Json(input): Json<NewAssignment>,
) -> Result<impl IntoResponse, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  actor.require(Role::Admin, ACTION)?;
  let assignment = state.assignments.add(&AccountId::new(id), input).await?;
  Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn replace<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
  Json(inputs): Json<Vec<NewAssignment>>,
) -> Result<Json<Vec<Assignment>>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  actor.require(Role::Admin, ACTION)?;
  Ok(Json(state.assignments.replace_all(&AccountId::new(id), inputs).await?))
}

pub async fn update<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path((id, aid)): Path<(String, String)>,
  Json(input): Json<NewAssignment>,
) -> Result<Json<Assignment>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  actor.require(Role::Admin, ACTION)?;
  let assignment = state.assignments.update(&AccountId::new(id), input.with_id(aid)).await?;
  Ok(Json(assignment))
}

pub async fn remove<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path((id, aid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  actor.require(Role::Admin, ACTION)?;
  state.assignments.remove(&AccountId::new(id), &aid).await?;
  Ok(StatusCode::NO_CONTENT)
}
