//! Visibility queries.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/visibility` | Body `{"teacherId":…,"target":{…}}` |
//! | `GET`  | `/teachers/{id}/students?class_id=` | The class roster the teacher may see |
//!
//! Both are open to admins and to the teacher being asked about. Assignments
//! that reference a class, section or group missing from the catalog are
//! reported as `409 Conflict` instead of being resolved.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use campus_core::{
  account::AccountId,
  assignment::{Assignment, load_assignments},
  directory::IdentityDirectory,
  roster::{RosterEntry, visible_students},
  store::DocumentStore,
  visibility::{Visibility, VisibilityTarget, resolve_visibility},
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError};

async fn current_assignments<D, S>(
  state: &AppState<D, S>,
  caller: &Caller,
  teacher: &AccountId,
) -> Result<Vec<Assignment>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  caller.require_self_or_admin(teacher)?;
  let assignments = load_assignments(state.store.as_ref(), teacher).await?;
  state.catalog.check_current(&assignments)?;
  Ok(assignments)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBody {
  pub teacher_id: AccountId,
  pub target:     VisibilityTarget,
}

pub async fn resolve<D, S>(
  State(state): State<AppState<D, S>>,
  caller: Caller,
  Json(body): Json<ResolveBody>,
) -> Result<Json<Visibility>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let assignments = current_assignments(&state, &caller, &body.teacher_id).await?;
  Ok(Json(resolve_visibility(&assignments, &body.target)?))
}

#[derive(Debug, Deserialize)]
pub struct RosterParams {
  pub class_id: String,
}

pub async fn roster<D, S>(
  State(state): State<AppState<D, S>>,
  caller: Caller,
  Path(id): Path<String>,
  Query(params): Query<RosterParams>,
) -> Result<Json<Vec<RosterEntry>>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let teacher = AccountId::new(id);
  let assignments = current_assignments(&state, &caller, &teacher).await?;
  let roster = visible_students(state.store.as_ref(), &assignments, &params.class_id).await?;
  Ok(Json(roster))
}
