//! The `IdentityDirectory` trait.

use std::future::Future;

use crate::{DirectoryError, account::AccountId};

/// Abstraction over the service of record for login credentials.
///
/// `create_account` is the single source of truth for login-email
/// uniqueness: it must atomically create-or-reject, returning
/// [`DirectoryError::DuplicateIdentity`] when the email is taken.
pub trait IdentityDirectory: Send + Sync {
  /// Register `email` with `password` and return the new account's id.
  fn create_account<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<AccountId, DirectoryError>> + Send + 'a;

  /// Remove an account. Fails with [`DirectoryError::AccountNotFound`] if it
  /// does not exist.
  fn delete_account<'a>(
    &'a self,
    id: &'a AccountId,
  ) -> impl Future<Output = Result<(), DirectoryError>> + Send + 'a;

  /// Check a credential pair. Returns the account id on success and `None`
  /// for an unknown email or a wrong password.
  fn authenticate<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Option<AccountId>, DirectoryError>> + Send + 'a;
}
