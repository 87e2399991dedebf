//! Error types for `campus-core`.
//!
//! Each collaborator boundary has its own error enum so callers can tell a
//! directory rejection from a store outage. [`ProvisionError`] is the failure
//! taxonomy surfaced by the provisioning saga.

use std::fmt;

use thiserror::Error;

use crate::{account::AccountId, account::Role, appraisal::AppraisalStatus};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Collaborator errors ─────────────────────────────────────────────────────

/// An error reported by an [`IdentityDirectory`](crate::directory::IdentityDirectory).
#[derive(Debug, Error)]
pub enum DirectoryError {
  #[error("email already registered: {0}")]
  DuplicateIdentity(String),

  #[error("weak credential: {0}")]
  WeakCredential(String),

  #[error("invalid identity: {0}")]
  InvalidIdentity(String),

  #[error("account not found: {0}")]
  AccountNotFound(AccountId),

  #[error("directory backend error: {0}")]
  Backend(#[source] BoxError),
}

impl DirectoryError {
  pub fn backend(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(e))
  }
}

/// An error reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("document not found: {0}")]
  NotFound(String),

  #[error("document already exists: {0}")]
  AlreadyExists(String),

  #[error("batch for root {expected:?} contains a write under {found:?}")]
  CrossRootBatch { expected: String, found: String },

  #[error("invalid document at {path}: {reason}")]
  InvalidData { path: String, reason: String },

  #[error("store backend error: {0}")]
  Backend(#[source] BoxError),
}

impl StoreError {
  pub fn backend(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(e))
  }
}

// ─── Domain errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(AccountId),

  #[error("account {0} is not a teacher")]
  NotATeacher(AccountId),

  #[error("teacher profile not found: {0}")]
  TeacherProfileNotFound(AccountId),

  #[error("student profile not found: {0}")]
  StudentNotFound(String),

  #[error("assignment not found: {0}")]
  AssignmentNotFound(String),

  #[error("invalid assignment configuration: {0}")]
  InvalidAssignmentConfiguration(String),

  #[error("stale visibility input: {0}")]
  StaleVisibilityInput(String),

  #[error("appraisal request not found: {0}")]
  AppraisalNotFound(String),

  #[error("appraisal request {id} is already {status}")]
  AppraisalTransitionConflict { id: String, status: AppraisalStatus },

  #[error("appraisal request {0} is still pending")]
  AppraisalNotProcessed(String),

  #[error("{actor} accounts may not {action}")]
  Forbidden { actor: Role, action: &'static str },

  #[error("{subject} for student {student} is outside the teacher's scope")]
  OutOfScope { student: String, subject: String },

  #[error("a {subject} remark for {month} already exists")]
  DuplicateRemark { subject: String, month: String },

  #[error("remark subject is required")]
  MissingSubject,

  #[error("invalid month {0:?}, expected YYYY-MM")]
  InvalidMonth(String),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Directory(#[from] DirectoryError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Provisioning ────────────────────────────────────────────────────────────

/// The step of the provisioning saga that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SagaStep {
  UserRecord,
  RoleProfile,
  StudentProfile,
}

/// Something a failed rollback could not remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leftover {
  Account(AccountId),
  Document(String),
}

impl fmt::Display for Leftover {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Account(id) => write!(f, "account {id}"),
      Self::Document(path) => write!(f, "document {path}"),
    }
  }
}

/// The failure taxonomy of [`ProvisioningCoordinator::provision`].
///
/// Only [`ProvisionError::ManualCleanupRequired`] leaves state behind.
///
/// [`ProvisioningCoordinator::provision`]: crate::provision::ProvisioningCoordinator::provision
#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("login email {email} is already registered")]
  DuplicateIdentity { email: String },

  #[error("weak credential: {0}")]
  WeakCredential(String),

  #[error("invalid identity: {0}")]
  InvalidIdentity(String),

  /// The profile payload is unusable; rejected before anything is created.
  #[error("invalid profile: {0}")]
  InvalidProfile(String),

  /// A document write failed and every completed step was undone.
  #[error("{step} write failed and was rolled back: {reason}")]
  DocumentWriteFailed { step: SagaStep, reason: String },

  /// A compensating delete failed; an operator must remove `leftovers`.
  #[error(
    "manual cleanup required for account {account_id} ({email}) after \
     {step} failed: {reason}"
  )]
  ManualCleanupRequired {
    account_id: AccountId,
    email:      String,
    step:       SagaStep,
    leftovers:  Vec<Leftover>,
    reason:     String,
  },

  #[error("provisioning failed: {0}")]
  Unknown(String),
}

impl ProvisionError {
  /// Map a rejection from the directory's create call. Nothing exists yet,
  /// so these are surfaced verbatim.
  pub(crate) fn from_directory(e: DirectoryError, email: &str) -> Self {
    match e {
      DirectoryError::DuplicateIdentity(_) => Self::DuplicateIdentity {
        email: email.to_owned(),
      },
      DirectoryError::WeakCredential(m) => Self::WeakCredential(m),
      DirectoryError::InvalidIdentity(m) => Self::InvalidIdentity(m),
      other => Self::Unknown(other.to_string()),
    }
  }

  /// `true` when nothing was persisted by the failed attempt.
  pub fn is_clean(&self) -> bool {
    !matches!(self, Self::ManualCleanupRequired { .. })
  }
}
