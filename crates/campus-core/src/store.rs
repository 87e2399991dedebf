//! The `DocumentStore` trait, document addressing, and batch writes.
//!
//! Documents are JSON objects addressed by a slash-separated path of
//! alternating collection and document segments, e.g.
//! `students/10/profiles/7f3c…`. The first segment is the *root collection*;
//! a [`DocumentStore::batch_write`] is atomic only within one root.

use std::{fmt, future::Future};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::StoreError;

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Path of a collection, e.g. `users` or `users/a1/assignments`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
  pub fn new(path: impl Into<String>) -> Self {
    let path: String = path.into();
    Self(path.trim_matches('/').to_owned())
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The first segment; the unit of batch atomicity.
  pub fn root(&self) -> &str {
    self.0.split('/').next().unwrap_or_default()
  }

  pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
    DocumentPath { collection: self.clone(), id: id.into() }
  }
}

impl fmt::Display for CollectionPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
  collection: CollectionPath,
  id:         String,
}

impl DocumentPath {
  pub fn collection(&self) -> &CollectionPath { &self.collection }

  pub fn id(&self) -> &str { &self.id }

  pub fn root(&self) -> &str { self.collection.root() }

  /// A sub-collection nested under this document.
  pub fn child(&self, name: &str) -> CollectionPath {
    CollectionPath(format!("{}/{}/{name}", self.collection, self.id))
  }
}

impl fmt::Display for DocumentPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.collection, self.id)
  }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// One write inside a [`DocumentStore::batch_write`].
#[derive(Debug, Clone)]
pub enum BatchOp {
  /// Create or overwrite.
  Set { path: DocumentPath, data: Value },
  /// Merge top-level fields into an existing document.
  Update { path: DocumentPath, fields: Map<String, Value> },
  Delete { path: DocumentPath },
}

impl BatchOp {
  pub fn path(&self) -> &DocumentPath {
    match self {
      Self::Set { path, .. } | Self::Update { path, .. } | Self::Delete { path } => {
        path
      }
    }
  }
}

/// Reject any op that falls outside `root`.
pub fn check_batch_root(root: &str, ops: &[BatchOp]) -> Result<(), StoreError> {
  match ops.iter().find(|op| op.path().root() != root) {
    Some(op) => Err(StoreError::CrossRootBatch {
      expected: root.to_owned(),
      found:    op.path().root().to_owned(),
    }),
    None => Ok(()),
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document store backend.
///
/// The store offers no atomicity across root collections and none at all with
/// the identity directory; callers that span both use a saga.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks and axum handlers.
pub trait DocumentStore: Send + Sync {
  /// Create or overwrite a document. With `id = None` the store assigns one.
  /// Returns the document id.
  fn write_document<'a>(
    &'a self,
    collection: &'a CollectionPath,
    id: Option<&'a str>,
    data: Value,
  ) -> impl Future<Output = Result<String, StoreError>> + Send + 'a;

  /// Create a document, failing with [`StoreError::AlreadyExists`] if one is
  /// already at `path`.
  fn create_document<'a>(
    &'a self,
    path: &'a DocumentPath,
    data: Value,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

  /// Read a document. Returns `None` if absent.
  fn read_document<'a>(
    &'a self,
    path: &'a DocumentPath,
  ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send + 'a;

  /// Merge top-level `fields` into an existing document. Fails with
  /// [`StoreError::NotFound`] if the document is absent.
  fn update_document<'a>(
    &'a self,
    path: &'a DocumentPath,
    fields: Map<String, Value>,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

  /// Delete a document. Deleting an absent document succeeds.
  fn delete_document<'a>(
    &'a self,
    path: &'a DocumentPath,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

  /// All documents directly inside `collection`, ordered by id.
  fn list_documents<'a>(
    &'a self,
    collection: &'a CollectionPath,
  ) -> impl Future<Output = Result<Vec<(String, Value)>, StoreError>> + Send + 'a;

  /// Apply `ops` atomically. Every op must live under `root`, otherwise the
  /// whole batch is rejected with [`StoreError::CrossRootBatch`].
  fn batch_write<'a>(
    &'a self,
    root: &'a str,
    ops: Vec<BatchOp>,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;
}

// ─── Typed helpers ───────────────────────────────────────────────────────────

/// Serialise a domain value into document data.
pub fn to_document<T: Serialize>(
  path: &DocumentPath,
  value: &T,
) -> Result<Value, StoreError> {
  serde_json::to_value(value).map_err(|e| StoreError::InvalidData {
    path:   path.to_string(),
    reason: e.to_string(),
  })
}

/// Deserialise document data into a domain value.
pub fn from_document<T: DeserializeOwned>(
  path: &DocumentPath,
  data: Value,
) -> Result<T, StoreError> {
  serde_json::from_value(data).map_err(|e| StoreError::InvalidData {
    path:   path.to_string(),
    reason: e.to_string(),
  })
}

/// Turn a serialised object into the field map expected by
/// [`DocumentStore::update_document`].
pub fn into_fields(path: &DocumentPath, data: Value) -> Result<Map<String, Value>, StoreError> {
  match data {
    Value::Object(map) => Ok(map),
    other => Err(StoreError::InvalidData {
      path:   path.to_string(),
      reason: format!("expected an object, got {other}"),
    }),
  }
}

/// Read and decode a document in one step.
pub async fn fetch<S, T>(store: &S, path: &DocumentPath) -> Result<Option<T>, StoreError>
where
  S: DocumentStore + ?Sized,
  T: DeserializeOwned,
{
  store
    .read_document(path)
    .await?
    .map(|data| from_document(path, data))
    .transpose()
}
