//! Accounts and the generic user record.
//!
//! An account lives in the identity directory; its [`UserRecord`] lives in the
//! document store under `users/{accountId}`. One exists iff the other does.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque identifier assigned by the identity directory.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AccountId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum Role {
  Admin,
  Teacher,
  Student,
  Coordinator,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
pub enum Status {
  #[default]
  Active,
  Inactive,
  Pending,
}

/// The `users/{accountId}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub name:               String,
  pub login_email:        String,
  pub role:               Role,
  pub status:             Status,
  pub last_login:         Option<DateTime<Utc>>,
  pub created_at:         DateTime<Utc>,
  /// Student linkage: the class partition holding the profile.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub class_id:           Option<String>,
  /// Student linkage: id of the profile under `students/{classId}/profiles`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student_profile_id: Option<String>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub account_id: AccountId,
  pub role:       Role,
}

impl Actor {
  pub fn new(account_id: AccountId, role: Role) -> Self {
    Self { account_id, role }
  }

  /// Fail with [`Error::Forbidden`] unless the actor holds `role`.
  pub fn require(&self, role: Role, action: &'static str) -> Result<()> {
    if self.role == role {
      Ok(())
    } else {
      Err(Error::Forbidden { actor: self.role, action })
    }
  }

  pub fn is(&self, id: &AccountId) -> bool { &self.account_id == id }
}
