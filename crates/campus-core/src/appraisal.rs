//! Appraisal escalations: a coordinator asks, an admin decides.
//!
//! `PendingAdminReview → {Approved, Rejected}`; both outcomes are terminal.
//! A decision is two separate document writes, the request's status first
//! and the teacher's profile second, with no atomicity between them. Both
//! writes are idempotent, so a failure of the second is reported rather than
//! compensated, and the admin can re-apply it later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, StoreError,
  account::{AccountId, Actor, Role},
  paths,
  profile::{SalaryEntry, TeacherProfile},
  store::{self, DocumentStore},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
pub enum AppraisalStatus {
  #[serde(rename = "Pending Admin Review")]
  #[strum(serialize = "Pending Admin Review")]
  PendingAdminReview,
  Approved,
  Rejected,
}

impl AppraisalStatus {
  pub fn is_terminal(self) -> bool { self != Self::PendingAdminReview }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  Approve,
  Reject,
}

impl Decision {
  fn outcome(self) -> AppraisalStatus {
    match self {
      Self::Approve => AppraisalStatus::Approved,
      Self::Reject => AppraisalStatus::Rejected,
    }
  }
}

/// The `appraisalRequests/{id}` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalRequest {
  pub id:              String,
  pub teacher_id:      AccountId,
  pub requested_by:    AccountId,
  pub justification:   String,
  pub status:          AppraisalStatus,
  pub requested_date:  DateTime<Utc>,
  #[serde(default)]
  pub admin_notes:     Option<String>,
  #[serde(default)]
  pub processed_date:  Option<DateTime<Utc>>,
  /// New monthly salary granted on approval; kept so the profile update can
  /// be re-applied.
  #[serde(default)]
  pub approved_figure: Option<u64>,
}

/// What happened to the teacher's profile after a decision was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProfileSync {
  Applied,
  /// The decision stands but the profile was not updated. Retry with
  /// [`AppraisalWorkflow::reapply_profile_update`].
  Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
  pub request: AppraisalRequest,
  pub profile: ProfileSync,
}

pub struct AppraisalWorkflow<S> {
  store: Arc<S>,
}

impl<S> AppraisalWorkflow<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn get(&self, id: &str) -> Result<AppraisalRequest> {
    store::fetch(self.store.as_ref(), &paths::appraisal_request(id))
      .await?
      .ok_or_else(|| Error::AppraisalNotFound(id.to_owned()))
  }

  /// Open a request for `teacher`. Coordinators only.
  pub async fn request_appraisal(
    &self,
    actor: &Actor,
    teacher: &AccountId,
    justification: &str,
  ) -> Result<AppraisalRequest> {
    actor.require(Role::Coordinator, "request appraisals")?;
    let profile: Option<TeacherProfile> =
      store::fetch(self.store.as_ref(), &paths::teacher_profile(teacher)).await?;
    if profile.is_none() {
      return Err(Error::TeacherProfileNotFound(teacher.clone()));
    }

    let request = AppraisalRequest {
      id:              Uuid::new_v4().to_string(),
      teacher_id:      teacher.clone(),
      requested_by:    actor.account_id.clone(),
      justification:   justification.trim().to_owned(),
      status:          AppraisalStatus::PendingAdminReview,
      requested_date:  Utc::now(),
      admin_notes:     None,
      processed_date:  None,
      approved_figure: None,
    };
    let path = paths::appraisal_request(&request.id);
    let data = store::to_document(&path, &request)?;
    self.store.create_document(&path, data).await?;

    info!(request = %request.id, teacher = %teacher, "appraisal requested");
    Ok(request)
  }

  /// Record an admin decision on a pending request, then apply it to the
  /// teacher's profile.
  ///
  /// A request that is no longer pending fails with
  /// [`Error::AppraisalTransitionConflict`] and nothing is written.
  pub async fn transition_appraisal(
    &self,
    actor: &Actor,
    id: &str,
    decision: Decision,
    notes: Option<String>,
    new_figure: Option<u64>,
  ) -> Result<TransitionOutcome> {
    actor.require(Role::Admin, "decide appraisals")?;

    let mut request = self.get(id).await?;
    if request.status.is_terminal() {
      return Err(Error::AppraisalTransitionConflict {
        id:     id.to_owned(),
        status: request.status,
      });
    }

    request.status = decision.outcome();
    request.admin_notes = notes;
    request.processed_date = Some(Utc::now());
    request.approved_figure = match decision {
      Decision::Approve => new_figure,
      Decision::Reject => None,
    };

    let path = paths::appraisal_request(id);
    let fields = store::into_fields(&path, store::to_document(&path, &request)?)?;
    self.store.update_document(&path, fields).await?;
    info!(request = id, status = %request.status, "appraisal decided");

    let profile = self.sync_profile(&request).await;
    Ok(TransitionOutcome { request, profile })
  }

  /// Re-apply a processed request's effect on the teacher's profile.
  pub async fn reapply_profile_update(
    &self,
    actor: &Actor,
    id: &str,
  ) -> Result<TransitionOutcome> {
    actor.require(Role::Admin, "decide appraisals")?;
    let request = self.get(id).await?;
    if !request.status.is_terminal() {
      return Err(Error::AppraisalNotProcessed(id.to_owned()));
    }
    let profile = self.sync_profile(&request).await;
    Ok(TransitionOutcome { request, profile })
  }

  async fn sync_profile(&self, request: &AppraisalRequest) -> ProfileSync {
    match self.apply_to_profile(request).await {
      Ok(()) => ProfileSync::Applied,
      Err(e) => {
        warn!(
          request = %request.id,
          teacher = %request.teacher_id,
          error = %e,
          "appraisal recorded but teacher profile not updated"
        );
        ProfileSync::Failed { reason: e.to_string() }
      }
    }
  }

  /// Mirror the decision onto the profile and, for an approval with a
  /// figure, set the salary. Salary history is keyed by request id so
  /// repeated application adds one entry at most.
  async fn apply_to_profile(&self, request: &AppraisalRequest) -> Result<(), StoreError> {
    let path = paths::teacher_profile(&request.teacher_id);
    let mut profile: TeacherProfile = store::fetch(self.store.as_ref(), &path)
      .await?
      .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

    let mut fields = Map::new();
    fields.insert("appraisalStatus".into(), json!(request.status));

    if let (AppraisalStatus::Approved, Some(figure)) = (request.status, request.approved_figure) {
      let already = profile
        .salary_history
        .iter()
        .any(|entry| entry.appraisal_id.as_deref() == Some(request.id.as_str()));
      if !already {
        profile.salary_history.push(SalaryEntry {
          monthly_amount: figure,
          effective_from: request.processed_date.unwrap_or_else(Utc::now),
          appraisal_id:   Some(request.id.clone()),
        });
      }
      fields.insert("currentSalary".into(), Value::from(figure));
      fields.insert("salaryHistory".into(), store::to_document(&path, &profile.salary_history)?);
    }

    self.store.update_document(&path, fields).await
  }
}
