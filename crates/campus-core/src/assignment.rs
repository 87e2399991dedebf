//! Teaching assignments and the per-teacher assignment registry.
//!
//! Assignments are stored one document each under
//! `users/{teacherId}/assignments/{assignmentId}` so that concurrent edits to
//! different assignments never overwrite each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result, StoreError,
  account::{AccountId, Role, UserRecord},
  catalog::SchoolCatalog,
  paths,
  store::{self, BatchOp, DocumentStore},
};

/// Subjects taught under the NIOS open-schooling programme.
pub const NIOS_SUBJECTS: &[&str] = &[
  "English",
  "Hindi",
  "Mathematics",
  "Science and Technology",
  "Social Science",
  "Home Science",
  "Painting",
  "Data Entry Operations",
];

/// Subjects taught in NCLP special training centres.
pub const NCLP_SUBJECTS: &[&str] = &[
  "Literacy",
  "Numeracy",
  "Environmental Studies",
  "Life Skills",
  "Vocational Training",
];

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentKind {
  ClassTeacher,
  MotherTeacher,
  SubjectTeacher,
  NiosTeacher,
  NclpTeacher,
}

impl AssignmentKind {
  /// Programme kinds scope by `groupId`; the rest scope by `sectionId`.
  pub fn is_programme(self) -> bool {
    matches!(self, Self::NiosTeacher | Self::NclpTeacher)
  }

  /// Fixed subject table of a programme kind; empty for the others.
  pub fn programme_subjects(self) -> &'static [&'static str] {
    match self {
      Self::NiosTeacher => NIOS_SUBJECTS,
      Self::NclpTeacher => NCLP_SUBJECTS,
      _ => &[],
    }
  }
}

/// A scoping rule binding a teacher to a class and optionally a section,
/// group, or subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
  pub id:         String,
  #[serde(rename = "type")]
  pub kind:       AssignmentKind,
  pub class_id:   String,
  #[serde(default)]
  pub section_id: Option<String>,
  #[serde(default)]
  pub subject_id: Option<String>,
  #[serde(default)]
  pub group_id:   Option<String>,
}

/// An assignment before the registry has given it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
  #[serde(rename = "type")]
  pub kind:       AssignmentKind,
  pub class_id:   String,
  #[serde(default)]
  pub section_id: Option<String>,
  #[serde(default)]
  pub subject_id: Option<String>,
  #[serde(default)]
  pub group_id:   Option<String>,
}

impl NewAssignment {
  pub fn with_id(self, id: impl Into<String>) -> Assignment {
    Assignment {
      id:         id.into(),
      kind:       self.kind,
      class_id:   self.class_id,
      section_id: self.section_id,
      subject_id: self.subject_id,
      group_id:   self.group_id,
    }
  }
}

/// Treat `Some("")` the same as `None`; the UI sends blank selects as empty
/// strings.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Assignment {
  /// Structural check that needs no catalog.
  pub fn check_shape(&self) -> Result<()> {
    if self.class_id.trim().is_empty() {
      return Err(Error::InvalidAssignmentConfiguration(format!(
        "assignment {:?} has no class",
        self.id
      )));
    }
    Ok(())
  }

  /// Full check against the school catalog: a subject teacher must name a
  /// subject whenever the class offers any, and a named subject must be one
  /// of the options.
  pub fn validate(&self, catalog: &SchoolCatalog) -> Result<()> {
    self.check_shape()?;
    if self.kind != AssignmentKind::SubjectTeacher {
      return Ok(());
    }

    let options = catalog.subject_options(self.kind, &self.class_id);
    match non_empty(&self.subject_id) {
      None if !options.is_empty() => Err(Error::InvalidAssignmentConfiguration(
        format!(
          "subject teacher assignment for class {} needs a subject",
          self.class_id
        ),
      )),
      Some(subject) if !options.is_empty() && !options.contains(&subject) => {
        Err(Error::InvalidAssignmentConfiguration(format!(
          "class {} does not offer {subject}",
          self.class_id
        )))
      }
      _ => Ok(()),
    }
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Materialise a teacher's assignment arena, ordered by id.
pub async fn load_assignments<S>(store: &S, teacher: &AccountId) -> Result<Vec<Assignment>>
where
  S: DocumentStore + ?Sized,
{
  let collection = paths::assignments(teacher);
  store
    .list_documents(&collection)
    .await?
    .into_iter()
    .map(|(id, data)| Ok(store::from_document(&collection.doc(id), data)?))
    .collect()
}

/// Per-record create/update/delete over a teacher's assignments.
pub struct AssignmentRegistry<S> {
  store:   Arc<S>,
  catalog: Arc<SchoolCatalog>,
}

impl<S> AssignmentRegistry<S>
where
  S: DocumentStore,
{
  pub fn new(store: Arc<S>, catalog: Arc<SchoolCatalog>) -> Self {
    Self { store, catalog }
  }

  async fn ensure_teacher(&self, teacher: &AccountId) -> Result<()> {
    let record: UserRecord = store::fetch(self.store.as_ref(), &paths::user(teacher))
      .await?
      .ok_or_else(|| Error::UserNotFound(teacher.clone()))?;
    if record.role != Role::Teacher {
      return Err(Error::NotATeacher(teacher.clone()));
    }
    Ok(())
  }

  /// The teacher's assignments, ordered by id.
  pub async fn list(&self, teacher: &AccountId) -> Result<Vec<Assignment>> {
    load_assignments(self.store.as_ref(), teacher).await
  }

  pub async fn add(
    &self,
    teacher: &AccountId,
    input: NewAssignment,
  ) -> Result<Assignment> {
    self.ensure_teacher(teacher).await?;
    let assignment = input.with_id(Uuid::new_v4().to_string());
    assignment.validate(&self.catalog)?;

    let path = paths::assignments(teacher).doc(&assignment.id);
    let data = store::to_document(&path, &assignment)?;
    self.store.create_document(&path, data).await?;

    info!(teacher = %teacher, assignment = %assignment.id, kind = %assignment.kind, "assignment added");
    Ok(assignment)
  }

  /// Overwrite one assignment's fields. The id in `assignment` selects it.
  pub async fn update(
    &self,
    teacher: &AccountId,
    assignment: Assignment,
  ) -> Result<Assignment> {
    assignment.validate(&self.catalog)?;

    let path = paths::assignments(teacher).doc(&assignment.id);
    let fields = store::into_fields(&path, store::to_document(&path, &assignment)?)?;
    match self.store.update_document(&path, fields).await {
      Err(StoreError::NotFound(_)) => Err(Error::AssignmentNotFound(assignment.id)),
      other => {
        other?;
        Ok(assignment)
      }
    }
  }

  pub async fn remove(&self, teacher: &AccountId, assignment_id: &str) -> Result<()> {
    let path = paths::assignments(teacher).doc(assignment_id);
    if self.store.read_document(&path).await?.is_none() {
      return Err(Error::AssignmentNotFound(assignment_id.to_owned()));
    }
    self.store.delete_document(&path).await?;
    info!(teacher = %teacher, assignment = assignment_id, "assignment removed");
    Ok(())
  }

  /// Replace the whole list in one atomic `users` batch.
  pub async fn replace_all(
    &self,
    teacher: &AccountId,
    inputs: Vec<NewAssignment>,
  ) -> Result<Vec<Assignment>> {
    self.ensure_teacher(teacher).await?;

    let replacements: Vec<Assignment> = inputs
      .into_iter()
      .map(|input| input.with_id(Uuid::new_v4().to_string()))
      .collect();
    for assignment in &replacements {
      assignment.validate(&self.catalog)?;
    }

    let collection = paths::assignments(teacher);
    let mut ops: Vec<BatchOp> = self
      .store
      .list_documents(&collection)
      .await?
      .into_iter()
      .map(|(id, _)| BatchOp::Delete { path: collection.doc(id) })
      .collect();
    for assignment in &replacements {
      let path = collection.doc(&assignment.id);
      let data = store::to_document(&path, assignment)?;
      ops.push(BatchOp::Set { path, data });
    }

    self.store.batch_write(paths::USERS, ops).await?;
    info!(teacher = %teacher, count = replacements.len(), "assignments replaced");

    let mut replacements = replacements;
    replacements.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(replacements)
  }
}
