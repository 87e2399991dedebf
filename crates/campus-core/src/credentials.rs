//! Login email derivation and default passwords.
//!
//! Derived logins are unique only as long as business keys are; the directory
//! still has the final word on collisions.

use crate::{ProvisionError, account::Role};

/// `{key}.{role}{year}@{domain}`, with `key` reduced to `[a-z0-9]`.
pub fn derive_login_email(
  business_key: &str,
  role: Role,
  year: i32,
  domain: &str,
) -> Result<String, ProvisionError> {
  let key: String = business_key
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect();
  if key.is_empty() {
    return Err(ProvisionError::InvalidIdentity(format!(
      "business key {business_key:?} has no usable characters"
    )));
  }
  let domain = domain.trim().trim_start_matches('@');
  if domain.is_empty() {
    return Err(ProvisionError::InvalidIdentity("no login email domain configured".into()));
  }
  let role = role.as_ref().to_ascii_lowercase();
  Ok(format!("{key}.{role}{year}@{domain}"))
}

/// The password handed out when the caller supplies none, e.g.
/// `Teacher@2025`.
pub fn default_password(role: Role, year: i32) -> String { format!("{role}@{year}") }

/// Trim and lower-case a caller-supplied login email.
pub fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derives_from_admission_number() {
    let email = derive_login_email("ADM/2024-117", Role::Student, 2025, "school.test").unwrap();
    assert_eq!(email, "adm2024117.student2025@school.test");
  }

  #[test]
  fn same_inputs_same_login() {
    let a = derive_login_email("Priya K", Role::Teacher, 2025, "@school.test").unwrap();
    let b = derive_login_email("Priya K", Role::Teacher, 2025, "school.test").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, "priyak.teacher2025@school.test");
  }

  #[test]
  fn unusable_key_is_invalid_identity() {
    assert!(matches!(
      derive_login_email(" -/ ", Role::Student, 2025, "school.test"),
      Err(ProvisionError::InvalidIdentity(_))
    ));
    assert!(derive_login_email("x", Role::Student, 2025, " ").is_err());
  }

  #[test]
  fn default_password_shape() {
    assert_eq!(default_password(Role::Coordinator, 2026), "Coordinator@2026");
  }
}
