//! [`SqliteDirectory`], a self-hosted [`IdentityDirectory`].
//!
//! Passwords are stored as argon2 PHC strings. The `UNIQUE` constraint on
//! `email` is the atomic create-or-reject the provisioning saga relies on.

use std::path::Path;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::Utc;
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use campus_core::{DirectoryError, account::AccountId, directory::IdentityDirectory};

use crate::{Error, Result, encode::encode_dt, schema};

/// Shortest password the directory accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct SqliteDirectory {
  conn: tokio_rusqlite::Connection,
}

fn check_email(email: &str) -> Result<(), DirectoryError> {
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if valid {
    Ok(())
  } else {
    Err(DirectoryError::InvalidIdentity(format!("{email:?} is not a valid email address")))
  }
}

fn check_password(password: &str) -> Result<(), DirectoryError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(DirectoryError::WeakCredential(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| Error::PasswordHash(e.to_string()))?
      .to_string(),
  )
}

impl SqliteDirectory {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let directory = Self { conn };
    directory.init_schema().await?;
    Ok(directory)
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let directory = Self { conn };
    directory.init_schema().await?;
    Ok(directory)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(schema::DIRECTORY)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert unless the email is taken. Returns `false` if it was.
  async fn insert(&self, id: String, email: String, hash: String) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO accounts (account_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![id, email, hash, now],
        )?;
        Ok(changed == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn remove(&self, id: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let changed =
          conn.execute("DELETE FROM accounts WHERE account_id = ?1", rusqlite::params![id])?;
        Ok(changed == 1)
      })
      .await?;
    Ok(removed)
  }

  async fn lookup(&self, email: String) -> Result<Option<(String, String)>> {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT account_id, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Number of accounts; used by operators and tests.
  pub async fn count(&self) -> Result<u64> {
    let n = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?))
      .await?;
    Ok(n)
  }
}

// ─── IdentityDirectory impl ──────────────────────────────────────────────────

impl IdentityDirectory for SqliteDirectory {
  async fn create_account(&self, email: &str, password: &str) -> Result<AccountId, DirectoryError> {
    check_email(email)?;
    check_password(password)?;

    let hash = hash_password(password)?;
    let id = Uuid::new_v4().to_string();
    if !self.insert(id.clone(), email.to_owned(), hash).await? {
      return Err(DirectoryError::DuplicateIdentity(email.to_owned()));
    }
    debug!(account = %id, "account inserted");
    Ok(AccountId::new(id))
  }

  async fn delete_account(&self, id: &AccountId) -> Result<(), DirectoryError> {
    if self.remove(id.as_str().to_owned()).await? {
      Ok(())
    } else {
      Err(DirectoryError::AccountNotFound(id.clone()))
    }
  }

  async fn authenticate(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Option<AccountId>, DirectoryError> {
    let Some((id, hash)) = self.lookup(email.to_owned()).await? else {
      return Ok(None);
    };
    let parsed = PasswordHash::new(&hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .ok()
        .map(|()| AccountId::new(id)),
    )
  }
}
