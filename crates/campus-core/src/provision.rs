//! The account-provisioning saga.
//!
//! Creating a person spans two systems with no shared transaction: the
//! identity directory and the document store. The coordinator runs the steps
//! in a fixed order (account, user record, dependent profile) and on any
//! document failure undoes the completed steps in reverse, deleting the
//! account last. If an undo itself fails it stops short of retrying and
//! reports [`ProvisionError::ManualCleanupRequired`].
//!
//! Each saga runs as a detached tokio task. Dropping the future returned by
//! [`ProvisioningCoordinator::provision`] (for example on a caller timeout)
//! only stops the caller waiting; the saga and any rollback still finish.

use std::sync::Arc;

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument as _, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
  DirectoryError, ProvisionError, StoreError,
  account::{AccountId, Role, Status, UserRecord},
  credentials::{default_password, derive_login_email, normalize_email},
  directory::IdentityDirectory,
  error::{Leftover, SagaStep},
  paths,
  profile::{ContactInfo, CoordinatorProfile, SalaryEntry, StudentProfile, TeacherProfile},
  store::{self, DocumentPath, DocumentStore},
};

// ─── Input ───────────────────────────────────────────────────────────────────

/// How the login email is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoginSpec {
  /// Use this address as-is (after trimming and lower-casing).
  Supplied { email: String },
  /// Derive one from a business key such as an admission number. `year`
  /// defaults to the current year.
  #[serde(rename_all = "camelCase")]
  Derived {
    business_key: String,
    #[serde(default)]
    year:         Option<i32>,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInput {
  #[serde(default)]
  pub contact:            ContactInfo,
  #[serde(default)]
  pub subjects_qualified: Vec<String>,
  pub qualification:      Option<String>,
  pub joining_date:       Option<NaiveDate>,
  pub monthly_salary:     Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorInput {
  #[serde(default)]
  pub contact:        ContactInfo,
  pub department:     Option<String>,
  pub joining_date:   Option<NaiveDate>,
  pub monthly_salary: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
  pub admission_number: String,
  pub class_id:         String,
  pub section_id:       Option<String>,
  pub group_id:         Option<String>,
  pub guardian_name:    Option<String>,
  pub guardian_phone:   Option<String>,
  pub date_of_birth:    Option<NaiveDate>,
}

/// The provisionable roles, each with the fields it requires. Admin accounts
/// are created out-of-band and have no variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "details")]
pub enum RoleInput {
  Teacher(TeacherInput),
  Coordinator(CoordinatorInput),
  Student(StudentInput),
}

impl RoleInput {
  pub fn role(&self) -> Role {
    match self {
      Self::Teacher(_) => Role::Teacher,
      Self::Coordinator(_) => Role::Coordinator,
      Self::Student(_) => Role::Student,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
  pub display_name: String,
  pub login:        LoginSpec,
  /// When absent a default is derived from role and year and returned once
  /// in [`Provisioned::generated_password`].
  #[serde(default)]
  pub password:     Option<String>,
  pub profile:      RoleInput,
}

impl ProvisionRequest {
  /// The year stamped on a derived login and on a default password.
  pub fn login_year(&self, now: DateTime<Utc>) -> i32 {
    match self.login {
      LoginSpec::Derived { year: Some(year), .. } => year,
      _ => now.year(),
    }
  }

  /// The password the saga assigns when the caller supplied none.
  pub fn pending_password(&self, now: DateTime<Utc>) -> Option<String> {
    self
      .password
      .is_none()
      .then(|| default_password(self.profile.role(), self.login_year(now)))
  }
}

/// A successfully provisioned person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioned {
  pub account_id:         AccountId,
  pub login_email:        String,
  pub role:               Role,
  /// Present only when the caller did not supply a password. The directory
  /// never returns it again.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub generated_password: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student_profile_id: Option<String>,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

pub struct ProvisioningCoordinator<D, S> {
  directory:    Arc<D>,
  store:        Arc<S>,
  email_domain: String,
}

impl<D, S> ProvisioningCoordinator<D, S>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  pub fn new(directory: Arc<D>, store: Arc<S>, email_domain: impl Into<String>) -> Self {
    Self { directory, store, email_domain: email_domain.into() }
  }

  /// Create the account and every dependent document, or none of them.
  pub async fn provision(
    &self,
    request: ProvisionRequest,
  ) -> Result<Provisioned, ProvisionError> {
    let saga = self.prepare(request, Utc::now())?;
    tokio::spawn(saga.run())
      .await
      .map_err(|e| ProvisionError::Unknown(format!("provisioning task failed: {e}")))?
  }

  /// Resolve login, password and dependent document ids. Pure; nothing is
  /// written yet.
  fn prepare(
    &self,
    request: ProvisionRequest,
    now: DateTime<Utc>,
  ) -> Result<Saga<D, S>, ProvisionError> {
    let role = request.profile.role();
    let name = request.display_name.trim().to_owned();
    if name.is_empty() {
      return Err(ProvisionError::InvalidProfile("display name is required".into()));
    }

    let year = request.login_year(now);
    let login_email = match &request.login {
      LoginSpec::Supplied { email } => normalize_email(email),
      LoginSpec::Derived { business_key, .. } => {
        derive_login_email(business_key, role, year, &self.email_domain)?
      }
    };

    let (password, generated_password) = match request.password {
      Some(password) => (password, None),
      None => {
        let password = default_password(role, year);
        (password.clone(), Some(password))
      }
    };

    let dependent = match request.profile {
      RoleInput::Teacher(input) => Dependent::Teacher(input),
      RoleInput::Coordinator(input) => Dependent::Coordinator(input),
      RoleInput::Student(input) => {
        if input.class_id.trim().is_empty() {
          return Err(ProvisionError::InvalidProfile("student class is required".into()));
        }
        if input.admission_number.trim().is_empty() {
          return Err(ProvisionError::InvalidProfile(
            "student admission number is required".into(),
          ));
        }
        Dependent::Student { profile_id: Uuid::new_v4().to_string(), input }
      }
    };

    Ok(Saga {
      directory: self.directory.clone(),
      store: self.store.clone(),
      name,
      login_email,
      password,
      generated_password,
      role,
      dependent,
      now,
    })
  }
}

// ─── Saga ────────────────────────────────────────────────────────────────────

enum Dependent {
  Teacher(TeacherInput),
  Coordinator(CoordinatorInput),
  Student { profile_id: String, input: StudentInput },
}

/// A step that has taken effect and must be undone on failure.
enum Completed {
  Account(AccountId),
  Document(DocumentPath),
}

struct Saga<D, S> {
  directory:          Arc<D>,
  store:              Arc<S>,
  name:               String,
  login_email:        String,
  password:           String,
  generated_password: Option<String>,
  role:               Role,
  dependent:          Dependent,
  now:                DateTime<Utc>,
}

fn opening_salary(amount: Option<u64>, now: DateTime<Utc>) -> Vec<SalaryEntry> {
  amount
    .map(|monthly_amount| SalaryEntry {
      monthly_amount,
      effective_from: now,
      appraisal_id: None,
    })
    .into_iter()
    .collect()
}

impl<D, S> Saga<D, S>
where
  D: IdentityDirectory,
  S: DocumentStore,
{
  async fn run(self) -> Result<Provisioned, ProvisionError> {
    let span = info_span!("provision", role = %self.role, email = %self.login_email);
    self.execute().instrument(span).await
  }

  async fn execute(self) -> Result<Provisioned, ProvisionError> {
    // Step 1: the directory decides uniqueness. Nothing to undo on failure.
    let account_id = self
      .directory
      .create_account(&self.login_email, &self.password)
      .await
      .map_err(|e| {
        warn!(error = %e, "directory rejected account");
        ProvisionError::from_directory(e, &self.login_email)
      })?;
    info!(account = %account_id, "account created");
    let mut completed = vec![Completed::Account(account_id.clone())];

    // Step 2: the user record.
    let user_path = paths::user(&account_id);
    let user_data = store::to_document(&user_path, &self.user_record());
    if let Err(e) = self.put(&user_path, user_data).await {
      return Err(self.compensate(&account_id, completed, SagaStep::UserRecord, e).await);
    }
    completed.push(Completed::Document(user_path));

    // Step 3: the role or student profile.
    let (step, path, data) = self.dependent_document(&account_id);
    if let Err(e) = self.put(&path, data).await {
      return Err(self.compensate(&account_id, completed, step, e).await);
    }

    info!(account = %account_id, "provisioning complete");
    Ok(Provisioned {
      account_id,
      login_email: self.login_email,
      role: self.role,
      generated_password: self.generated_password,
      student_profile_id: match self.dependent {
        Dependent::Student { profile_id, .. } => Some(profile_id),
        _ => None,
      },
    })
  }

  async fn put(
    &self,
    path: &DocumentPath,
    data: Result<Value, StoreError>,
  ) -> Result<(), StoreError> {
    self
      .store
      .write_document(path.collection(), Some(path.id()), data?)
      .await
      .map(drop)
  }

  fn user_record(&self) -> UserRecord {
    let (class_id, student_profile_id) = match &self.dependent {
      Dependent::Student { profile_id, input } => {
        (Some(input.class_id.clone()), Some(profile_id.clone()))
      }
      _ => (None, None),
    };
    UserRecord {
      name: self.name.clone(),
      login_email: self.login_email.clone(),
      role: self.role,
      status: Status::Active,
      last_login: None,
      created_at: self.now,
      class_id,
      student_profile_id,
    }
  }

  fn dependent_document(
    &self,
    account_id: &AccountId,
  ) -> (SagaStep, DocumentPath, Result<Value, StoreError>) {
    match &self.dependent {
      Dependent::Teacher(input) => {
        let path = paths::teacher_profile(account_id);
        let profile = TeacherProfile {
          account_id:         account_id.clone(),
          name:               self.name.clone(),
          contact:            input.contact.clone(),
          subjects_qualified: input.subjects_qualified.clone(),
          qualification:      input.qualification.clone(),
          joining_date:       input.joining_date,
          current_salary:     input.monthly_salary,
          salary_history:     opening_salary(input.monthly_salary, self.now),
          appraisal_status:   None,
        };
        let data = store::to_document(&path, &profile);
        (SagaStep::RoleProfile, path, data)
      }
      Dependent::Coordinator(input) => {
        let path = paths::coordinator_profile(account_id);
        let profile = CoordinatorProfile {
          account_id:     account_id.clone(),
          name:           self.name.clone(),
          contact:        input.contact.clone(),
          department:     input.department.clone(),
          joining_date:   input.joining_date,
          current_salary: input.monthly_salary,
          salary_history: opening_salary(input.monthly_salary, self.now),
        };
        let data = store::to_document(&path, &profile);
        (SagaStep::RoleProfile, path, data)
      }
      Dependent::Student { profile_id, input } => {
        let path = paths::student_profile(&input.class_id, profile_id);
        let profile = StudentProfile {
          account_id:       account_id.clone(),
          name:             self.name.clone(),
          admission_number: input.admission_number.clone(),
          class_id:         input.class_id.clone(),
          section_id:       input.section_id.clone(),
          group_id:         input.group_id.clone(),
          guardian_name:    input.guardian_name.clone(),
          guardian_phone:   input.guardian_phone.clone(),
          date_of_birth:    input.date_of_birth,
          scholarships:     Vec::new(),
          exam_records:     Vec::new(),
          attendance:       Default::default(),
        };
        let data = store::to_document(&path, &profile);
        (SagaStep::StudentProfile, path, data)
      }
    }
  }

  /// Undo `completed` in reverse. Every undo is attempted once even if an
  /// earlier one failed; whatever could not be removed is reported.
  async fn compensate(
    &self,
    account_id: &AccountId,
    completed: Vec<Completed>,
    step: SagaStep,
    cause: StoreError,
  ) -> ProvisionError {
    warn!(%step, error = %cause, "write failed, rolling back");

    let mut leftovers = Vec::new();
    for done in completed.into_iter().rev() {
      match done {
        Completed::Document(path) => {
          if let Err(e) = self.store.delete_document(&path).await {
            error!(document = %path, error = %e, "compensating delete failed");
            leftovers.push(Leftover::Document(path.to_string()));
          }
        }
        Completed::Account(id) => match self.directory.delete_account(&id).await {
          Ok(()) | Err(DirectoryError::AccountNotFound(_)) => {}
          Err(e) => {
            error!(account = %id, error = %e, "compensating account delete failed");
            leftovers.push(Leftover::Account(id));
          }
        },
      }
    }

    if leftovers.is_empty() {
      info!(%step, "rollback complete");
      ProvisionError::DocumentWriteFailed { step, reason: cause.to_string() }
    } else {
      error!(
        account = %account_id,
        email = %self.login_email,
        ?leftovers,
        "rollback incomplete, manual cleanup required"
      );
      ProvisionError::ManualCleanupRequired {
        account_id: account_id.clone(),
        email: self.login_email.clone(),
        step,
        leftovers,
        reason: cause.to_string(),
      }
    }
  }
}

#[cfg(test)]
mod tests;
