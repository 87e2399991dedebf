//! Reads and small updates on `users/{accountId}` records.

use chrono::Utc;
use serde_json::{Map, json};
use tracing::{error, info};

use crate::{
  Error, ProvisionError, Result,
  account::{AccountId, Actor, Role, Status, UserRecord},
  credentials::normalize_email,
  directory::IdentityDirectory,
  error::{Leftover, SagaStep},
  paths,
  store::{self, DocumentStore},
};

pub async fn load_user<S>(store: &S, id: &AccountId) -> Result<UserRecord>
where
  S: DocumentStore + ?Sized,
{
  store::fetch(store, &paths::user(id))
    .await?
    .ok_or_else(|| Error::UserNotFound(id.clone()))
}

/// Change an account's status. Admins only.
pub async fn set_status<S>(
  store: &S,
  actor: &Actor,
  id: &AccountId,
  status: Status,
) -> Result<UserRecord>
where
  S: DocumentStore + ?Sized,
{
  actor.require(Role::Admin, "change account status")?;
  let mut record = load_user(store, id).await?;

  let mut fields = Map::new();
  fields.insert("status".into(), json!(status));
  store.update_document(&paths::user(id), fields).await?;

  info!(account = %id, %status, "account status changed");
  record.status = status;
  Ok(record)
}

/// Stamp `lastLogin` and return the updated record.
pub async fn record_login<S>(store: &S, id: &AccountId) -> Result<UserRecord>
where
  S: DocumentStore + ?Sized,
{
  let mut record = load_user(store, id).await?;
  let now = Utc::now();

  let mut fields = Map::new();
  fields.insert("lastLogin".into(), json!(now));
  store.update_document(&paths::user(id), fields).await?;

  record.last_login = Some(now);
  Ok(record)
}

/// Create an Admin account and its user record outside the provisioning
/// saga, which does not accept the Admin role.
///
/// A failed record write deletes the account again.
pub async fn bootstrap_admin<D, S>(
  directory: &D,
  store: &S,
  name: &str,
  email: &str,
  password: &str,
) -> Result<AccountId, ProvisionError>
where
  D: IdentityDirectory + ?Sized,
  S: DocumentStore + ?Sized,
{
  let email = normalize_email(email);
  let account_id = directory
    .create_account(&email, password)
    .await
    .map_err(|e| ProvisionError::from_directory(e, &email))?;

  let record = UserRecord {
    name:               name.to_owned(),
    login_email:        email.clone(),
    role:               Role::Admin,
    status:             Status::Active,
    last_login:         None,
    created_at:         Utc::now(),
    class_id:           None,
    student_profile_id: None,
  };
  let path = paths::user(&account_id);
  let written = match store::to_document(&path, &record) {
    Ok(data) => store.write_document(path.collection(), Some(path.id()), data).await,
    Err(e) => Err(e),
  };

  match written {
    Ok(_) => {
      info!(account = %account_id, %email, "admin account created");
      Ok(account_id)
    }
    Err(write_err) => match directory.delete_account(&account_id).await {
      Ok(()) => Err(ProvisionError::DocumentWriteFailed {
        step:   SagaStep::UserRecord,
        reason: write_err.to_string(),
      }),
      Err(delete_err) => {
        error!(account = %account_id, %email, error = %delete_err, "admin account orphaned");
        Err(ProvisionError::ManualCleanupRequired {
          leftovers: vec![Leftover::Account(account_id.clone())],
          account_id,
          email,
          step: SagaStep::UserRecord,
          reason: write_err.to_string(),
        })
      }
    },
  }
}
