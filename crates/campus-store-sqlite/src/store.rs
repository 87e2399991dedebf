//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde_json::{Map, Value};
use uuid::Uuid;

use campus_core::{
  StoreError,
  store::{BatchOp, CollectionPath, DocumentPath, DocumentStore, check_batch_root},
};

use crate::{
  Result,
  encode::{decode_data, encode_data, encode_dt, in_call, merge_fields},
  schema,
};

const UPSERT: &str = "
  INSERT INTO documents (collection, doc_id, root, data, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?5)
  ON CONFLICT (collection, doc_id)
  DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at";

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Owned column values for one document row.
struct Key {
  collection: String,
  doc_id:     String,
  root:       String,
}

impl From<&DocumentPath> for Key {
  fn from(path: &DocumentPath) -> Self {
    Self {
      collection: path.collection().as_str().to_owned(),
      doc_id:     path.id().to_owned(),
      root:       path.root().to_owned(),
    }
  }
}

/// A batch op lowered to plain column values.
enum RawOp {
  Set { key: Key, data: String },
  Update { key: Key, path: String, fields: Map<String, Value> },
  Delete { key: Key },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(schema::DOCUMENTS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert(&self, key: Key, data: &Value) -> Result<()> {
    let data = encode_data(data)?;
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          UPSERT,
          rusqlite::params![key.collection, key.doc_id, key.root, data, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert unless a row exists. Returns `false` if one did.
  async fn insert_new(&self, key: Key, data: &Value) -> Result<bool> {
    let data = encode_data(data)?;
    let now = encode_dt(Utc::now());
    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO documents (collection, doc_id, root, data, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           ON CONFLICT (collection, doc_id) DO NOTHING",
          rusqlite::params![key.collection, key.doc_id, key.root, data, now],
        )?;
        Ok(changed == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn read(&self, key: Key) -> Result<Option<Value>> {
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
              rusqlite::params![key.collection, key.doc_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.as_deref().map(decode_data).transpose()
  }

  /// Merge `fields` into an existing row. Returns `false` if it is absent.
  async fn merge(&self, key: Key, path: String, fields: Map<String, Value>) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let found = merge_row(&tx, &key, &path, fields, &now)?;
        tx.commit()?;
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  async fn remove(&self, key: Key) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
          rusqlite::params![key.collection, key.doc_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list(&self, collection: String) -> Result<Vec<(String, Value)>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT doc_id, data FROM documents WHERE collection = ?1 ORDER BY doc_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, raw)| Ok((id, decode_data(&raw)?)))
      .collect()
  }

  /// Apply every op in one transaction. Returns the path of the first
  /// `Update` whose target is missing, in which case nothing is committed.
  async fn apply(&self, ops: Vec<RawOp>) -> Result<Option<String>> {
    let now = encode_dt(Utc::now());
    let missing = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for op in ops {
          match op {
            RawOp::Set { key, data } => {
              tx.execute(
                UPSERT,
                rusqlite::params![key.collection, key.doc_id, key.root, data, now],
              )?;
            }
            RawOp::Update { key, path, fields } => {
              if !merge_row(&tx, &key, &path, fields, &now)? {
                // Dropping `tx` rolls back.
                return Ok(Some(path));
              }
            }
            RawOp::Delete { key } => {
              tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                rusqlite::params![key.collection, key.doc_id],
              )?;
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;
    Ok(missing)
  }
}

/// Read-merge-write one row inside `tx`.
fn merge_row(
  tx: &rusqlite::Transaction<'_>,
  key: &Key,
  path: &str,
  fields: Map<String, Value>,
  now: &str,
) -> tokio_rusqlite::Result<bool> {
  let raw: Option<String> = tx
    .query_row(
      "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
      rusqlite::params![key.collection, key.doc_id],
      |row| row.get(0),
    )
    .optional()?;
  let Some(raw) = raw else {
    return Ok(false);
  };

  let merged = merge_fields(path, &raw, fields).map_err(in_call)?;
  tx.execute(
    "UPDATE documents SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND doc_id = ?2",
    rusqlite::params![key.collection, key.doc_id, merged, now],
  )?;
  Ok(true)
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  async fn write_document(
    &self,
    collection: &CollectionPath,
    id: Option<&str>,
    data: Value,
  ) -> Result<String, StoreError> {
    let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    let path = collection.doc(id.as_str());
    self.upsert(Key::from(&path), &data).await?;
    Ok(id)
  }

  async fn create_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
    if self.insert_new(Key::from(path), &data).await? {
      Ok(())
    } else {
      Err(StoreError::AlreadyExists(path.to_string()))
    }
  }

  async fn read_document(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
    Ok(self.read(Key::from(path)).await?)
  }

  async fn update_document(
    &self,
    path: &DocumentPath,
    fields: Map<String, Value>,
  ) -> Result<(), StoreError> {
    if self.merge(Key::from(path), path.to_string(), fields).await? {
      Ok(())
    } else {
      Err(StoreError::NotFound(path.to_string()))
    }
  }

  async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError> {
    Ok(self.remove(Key::from(path)).await?)
  }

  async fn list_documents(
    &self,
    collection: &CollectionPath,
  ) -> Result<Vec<(String, Value)>, StoreError> {
    Ok(self.list(collection.as_str().to_owned()).await?)
  }

  async fn batch_write(&self, root: &str, ops: Vec<BatchOp>) -> Result<(), StoreError> {
    check_batch_root(root, &ops)?;

    let mut raw = Vec::with_capacity(ops.len());
    for op in ops {
      raw.push(match op {
        BatchOp::Set { path, data } => RawOp::Set {
          key:  Key::from(&path),
          data: encode_data(&data)?,
        },
        BatchOp::Update { path, fields } => RawOp::Update {
          key: Key::from(&path),
          path: path.to_string(),
          fields,
        },
        BatchOp::Delete { path } => RawOp::Delete { key: Key::from(&path) },
      });
    }

    match self.apply(raw).await? {
      None => Ok(()),
      Some(missing) => Err(StoreError::NotFound(missing)),
    }
  }
}
