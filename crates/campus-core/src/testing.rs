//! In-memory collaborators with fault injection, for tests only.

use std::{
  collections::BTreeMap,
  io,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  DirectoryError, StoreError,
  account::{AccountId, Role, Status, UserRecord},
  directory::IdentityDirectory,
  paths,
  store::{self, BatchOp, CollectionPath, DocumentPath, DocumentStore},
};

fn injected(what: &str) -> io::Error { io::Error::other(format!("injected {what} failure")) }

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDirectory {
  accounts:     Mutex<BTreeMap<AccountId, (String, String)>>,
  next_id:      AtomicU64,
  fail_deletes: AtomicBool,
  delete_delay: Mutex<Option<Duration>>,
}

impl MemoryDirectory {
  pub fn len(&self) -> usize { self.accounts.lock().unwrap().len() }

  pub fn has_email(&self, email: &str) -> bool {
    self.accounts.lock().unwrap().values().any(|(e, _)| e == email)
  }

  pub fn has_account(&self, id: &AccountId) -> bool {
    self.accounts.lock().unwrap().contains_key(id)
  }

  pub fn fail_deletes(&self) { self.fail_deletes.store(true, Ordering::SeqCst); }

  pub fn delay_deletes(&self, delay: Duration) {
    *self.delete_delay.lock().unwrap() = Some(delay);
  }
}

impl IdentityDirectory for MemoryDirectory {
  async fn create_account(&self, email: &str, password: &str) -> Result<AccountId, DirectoryError> {
    if !email.contains('@') {
      return Err(DirectoryError::InvalidIdentity(format!("{email:?} is not an email")));
    }
    if password.len() < 6 {
      return Err(DirectoryError::WeakCredential("too short".into()));
    }

    let mut accounts = self.accounts.lock().unwrap();
    if accounts.values().any(|(e, _)| e == email) {
      return Err(DirectoryError::DuplicateIdentity(email.to_owned()));
    }
    let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let id = AccountId::new(format!("acct-{n}"));
    accounts.insert(id.clone(), (email.to_owned(), password.to_owned()));
    Ok(id)
  }

  async fn delete_account(&self, id: &AccountId) -> Result<(), DirectoryError> {
    let delay = *self.delete_delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Err(DirectoryError::backend(injected("account delete")));
    }
    match self.accounts.lock().unwrap().remove(id) {
      Some(_) => Ok(()),
      None => Err(DirectoryError::AccountNotFound(id.clone())),
    }
  }

  async fn authenticate(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Option<AccountId>, DirectoryError> {
    Ok(
      self
        .accounts
        .lock()
        .unwrap()
        .iter()
        .find(|(_, (e, p))| e == email && p == password)
        .map(|(id, _)| id.clone()),
    )
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  docs:           Mutex<BTreeMap<String, Value>>,
  failing_writes: Mutex<Vec<String>>,
  fail_deletes:   AtomicBool,
}

impl MemoryStore {
  pub fn len(&self) -> usize { self.docs.lock().unwrap().len() }

  pub fn get(&self, path: &str) -> Option<Value> { self.docs.lock().unwrap().get(path).cloned() }

  pub fn snapshot(&self) -> BTreeMap<String, Value> { self.docs.lock().unwrap().clone() }

  /// Make every write to a path starting with `prefix` fail.
  pub fn fail_writes_under(&self, prefix: &str) {
    self.failing_writes.lock().unwrap().push(prefix.to_owned());
  }

  pub fn fail_deletes(&self) { self.fail_deletes.store(true, Ordering::SeqCst); }

  pub fn heal(&self) {
    self.failing_writes.lock().unwrap().clear();
    self.fail_deletes.store(false, Ordering::SeqCst);
  }

  fn check_write(&self, path: &str) -> Result<(), StoreError> {
    let failing = self.failing_writes.lock().unwrap();
    if failing.iter().any(|prefix| path.starts_with(prefix.as_str())) {
      return Err(StoreError::backend(injected("write")));
    }
    Ok(())
  }
}

fn merge(target: &mut Value, fields: Map<String, Value>) {
  if let Value::Object(existing) = target {
    existing.extend(fields);
  }
}

impl DocumentStore for MemoryStore {
  async fn write_document(
    &self,
    collection: &CollectionPath,
    id: Option<&str>,
    data: Value,
  ) -> Result<String, StoreError> {
    let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    let path = collection.doc(id.clone()).to_string();
    self.check_write(&path)?;
    self.docs.lock().unwrap().insert(path, data);
    Ok(id)
  }

  async fn create_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
    let key = path.to_string();
    self.check_write(&key)?;
    let mut docs = self.docs.lock().unwrap();
    if docs.contains_key(&key) {
      return Err(StoreError::AlreadyExists(key));
    }
    docs.insert(key, data);
    Ok(())
  }

  async fn read_document(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
    Ok(self.get(&path.to_string()))
  }

  async fn update_document(
    &self,
    path: &DocumentPath,
    fields: Map<String, Value>,
  ) -> Result<(), StoreError> {
    let key = path.to_string();
    self.check_write(&key)?;
    let mut docs = self.docs.lock().unwrap();
    let doc = docs.get_mut(&key).ok_or(StoreError::NotFound(key.clone()))?;
    merge(doc, fields);
    Ok(())
  }

  async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError> {
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Err(StoreError::backend(injected("delete")));
    }
    self.docs.lock().unwrap().remove(&path.to_string());
    Ok(())
  }

  async fn list_documents(
    &self,
    collection: &CollectionPath,
  ) -> Result<Vec<(String, Value)>, StoreError> {
    let prefix = format!("{collection}/");
    Ok(
      self
        .docs
        .lock()
        .unwrap()
        .iter()
        .filter_map(|(key, value)| {
          let id = key.strip_prefix(&prefix)?;
          (!id.contains('/')).then(|| (id.to_owned(), value.clone()))
        })
        .collect(),
    )
  }

  async fn batch_write(&self, root: &str, ops: Vec<BatchOp>) -> Result<(), StoreError> {
    store::check_batch_root(root, &ops)?;
    for op in &ops {
      self.check_write(&op.path().to_string())?;
    }

    let mut docs = self.docs.lock().unwrap();
    let mut staged = docs.clone();
    for op in ops {
      match op {
        BatchOp::Set { path, data } => {
          staged.insert(path.to_string(), data);
        }
        BatchOp::Update { path, fields } => {
          let key = path.to_string();
          let doc = staged.get_mut(&key).ok_or(StoreError::NotFound(key.clone()))?;
          merge(doc, fields);
        }
        BatchOp::Delete { path } => {
          staged.remove(&path.to_string());
        }
      }
    }
    *docs = staged;
    Ok(())
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn user_record(name: &str, role: Role) -> UserRecord {
  UserRecord {
    name: name.to_owned(),
    login_email: format!("{}@school.test", name.to_lowercase()),
    role,
    status: Status::Active,
    last_login: None,
    created_at: Utc::now(),
    class_id: None,
    student_profile_id: None,
  }
}

/// Write a bare user record for `id` with `role`.
pub async fn seed_user(store: &MemoryStore, id: &str, role: Role) {
  let path = paths::user(&AccountId::new(id));
  let data = store::to_document(&path, &user_record(id, role)).unwrap();
  store
    .write_document(path.collection(), Some(path.id()), data)
    .await
    .unwrap();
}
