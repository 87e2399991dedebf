//! `POST /provision`: create a Teacher, Coordinator or Student.
//!
//! The saga is bounded by the configured timeout. If it has not finished by
//! then the response is `202 Accepted`; the saga, including any rollback,
//! keeps running in the background. When the caller supplied no password
//! the pending response still carries the default one the saga assigns.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use campus_core::{
  account::Role, directory::IdentityDirectory, provision::ProvisionRequest,
  store::DocumentStore,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::{AppState, auth::Caller, error::ApiError};

pub async fn provision<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Json(request): Json<ProvisionRequest>,
) -> Result<Response, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  actor.require(Role::Admin, "provision accounts")?;
  let role = request.profile.role();
  let pending_password = request.pending_password(Utc::now());

  match tokio::time::timeout(state.provision_timeout, state.provisioning.provision(request)).await
  {
    Ok(Ok(done)) => Ok((StatusCode::CREATED, Json(done)).into_response()),
    Ok(Err(e)) => Err(e.into()),
    Err(_) => {
      warn!(%role, timeout = ?state.provision_timeout, "provisioning still running after timeout");
      let mut body = json!({
        "status": "pending",
        "message": "provisioning is still running; check the user list before retrying",
      });
      if let Some(password) = pending_password {
        body["generatedPassword"] = password.into();
      }
      Ok((StatusCode::ACCEPTED, Json(body)).into_response())
    }
  }
}
