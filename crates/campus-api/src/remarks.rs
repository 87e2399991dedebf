//! `POST /remarks`: record a monthly remark as the calling teacher.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use campus_core::{directory::IdentityDirectory, remarks::RemarkInput, store::DocumentStore};

use crate::{AppState, auth::Caller, error::ApiError};

pub async fn create<D, S>(
  State(state): State<AppState<D, S>>,
  Caller(actor): Caller,
  Json(input): Json<RemarkInput>,
) -> Result<impl IntoResponse, ApiError>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  let remark = state.remarks.record_monthly_remark(&actor, input).await?;
  Ok((StatusCode::CREATED, Json(remark)))
}
