//! Handlers for `/appraisals` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/appraisals` | Coordinator; body `{"teacherId":…,"justification":…}` |
//! | `GET`  | `/appraisals/{id}` | Admin or coordinator |
//! | `POST` | `/appraisals/{id}/transition` | Admin; body `{"decision":"approve",…}` |
//! | `POST` | `/appraisals/{id}/reapply` | Admin; retries the profile update |
//!
//! A decision whose profile update failed still answers `200`; the outcome's
//! `profile.state` is `failed` and the admin can call `reapply`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  account::{AccountId, Role},
  appraisal::{AppraisalRequest, Decision, TransitionOutcome},
  directory::IdentityDirectory,
  store::DocumentStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub teacher_id:    AccountId,
  pub justification: String,
}

pub async fn create<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let request = state
    .appraisals
    .request_appraisal(&actor, &body.teacher_id, &body.justification)
    .await?;
  Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_one<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
) -> Result<Json<AppraisalRequest>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  if !matches!(actor.role, Role::Admin | Role::Coordinator) {
    return Err(ApiError::Forbidden(format!("{} accounts may not view appraisals", actor.role)));
  }
  Ok(Json(state.appraisals.get(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
  pub decision:   Decision,
  #[serde(default)]
  pub notes:      Option<String>,
  #[serde(default)]
  pub new_figure: Option<u64>,
}

pub async fn transition<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<TransitionOutcome>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let outcome = state
    .appraisals
    .transition_appraisal(&actor, &id, body.decision, body.notes, body.new_figure)
    .await?;
  Ok(Json(outcome))
}

pub async fn reapply<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Path(id): Path<String>,
) -> Result<Json<TransitionOutcome>, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  Ok(Json(state.appraisals.reapply_profile_update(&actor, &id).await?))
}
