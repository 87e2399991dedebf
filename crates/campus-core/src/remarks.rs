//! Monthly teacher remarks on students.
//!
//! At most one remark per student, subject and calendar month. The document
//! id encodes that key, so the store's create-if-absent is the uniqueness
//! check.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  Error, Result, StoreError,
  account::{AccountId, Actor, Role},
  assignment::load_assignments,
  paths,
  profile::StudentProfile,
  store::{self, DocumentStore},
  visibility::{VisibilityTarget, resolve_visibility},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemarkInput {
  pub class_id:           String,
  pub student_profile_id: String,
  pub subject:            String,
  /// `YYYY-MM`.
  pub month:              String,
  pub text:               String,
}

/// A `students/{classId}/profiles/{pid}/remarks/{id}` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRemark {
  pub id:         String,
  pub subject:    String,
  pub month:      String,
  pub text:       String,
  pub teacher_id: AccountId,
  pub created_at: DateTime<Utc>,
}

fn parse_month(month: &str) -> Result<String> {
  let trimmed = month.trim();
  NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
    .map(|date| date.format("%Y-%m").to_string())
    .map_err(|_| Error::InvalidMonth(month.to_owned()))
}

/// Document id for a subject and month, e.g. `Social_20Science-2025-07`.
///
/// ASCII letters and digits are kept; every other byte of the subject becomes
/// `_` followed by two hex digits, so distinct subjects never share an id.
fn remark_id(subject: &str, month: &str) -> String {
  let mut id = String::with_capacity(subject.len() + month.len() + 1);
  for byte in subject.bytes() {
    if byte.is_ascii_alphanumeric() {
      id.push(char::from(byte));
    } else {
      id.push('_');
      id.push_str(&hex::encode([byte]));
    }
  }
  id.push('-');
  id.push_str(month);
  id
}

pub struct RemarkBook<S> {
  store: Arc<S>,
}

impl<S> RemarkBook<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Record a remark by the acting teacher.
  ///
  /// The student must be visible to the teacher with `subject` in scope,
  /// otherwise [`Error::OutOfScope`]. A blank subject is
  /// [`Error::MissingSubject`].
  pub async fn record_monthly_remark(
    &self,
    actor: &Actor,
    input: RemarkInput,
  ) -> Result<MonthlyRemark> {
    actor.require(Role::Teacher, "record remarks")?;
    let month = parse_month(&input.month)?;
    let subject = input.subject.trim().to_owned();
    if subject.is_empty() {
      return Err(Error::MissingSubject);
    }

    let profile_path = paths::student_profile(&input.class_id, &input.student_profile_id);
    let profile: StudentProfile = store::fetch(self.store.as_ref(), &profile_path)
      .await?
      .ok_or_else(|| Error::StudentNotFound(profile_path.to_string()))?;

    let assignments = load_assignments(self.store.as_ref(), &actor.account_id).await?;
    let visibility = resolve_visibility(&assignments, &VisibilityTarget::from(&profile))?;
    if !visibility.visible || !visibility.subjects_in_scope.contains(&subject) {
      return Err(Error::OutOfScope {
        student: input.student_profile_id,
        subject,
      });
    }

    let remark = MonthlyRemark {
      id: remark_id(&subject, &month),
      subject,
      month,
      text: input.text.trim().to_owned(),
      teacher_id: actor.account_id.clone(),
      created_at: Utc::now(),
    };
    let path = paths::remarks(&input.class_id, &input.student_profile_id).doc(&remark.id);
    let data = store::to_document(&path, &remark)?;
    match self.store.create_document(&path, data).await {
      Ok(()) => {}
      Err(StoreError::AlreadyExists(_)) => {
        return Err(Error::DuplicateRemark {
          subject: remark.subject,
          month:   remark.month,
        });
      }
      Err(e) => return Err(e.into()),
    }

    info!(student = %profile_path, remark = %remark.id, teacher = %actor.account_id, "remark recorded");
    Ok(remark)
  }
}
