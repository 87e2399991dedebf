//! The students of a class that a teacher may see.

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  assignment::Assignment,
  paths,
  profile::StudentProfile,
  store::{self, DocumentStore},
  visibility::{SubjectScope, VisibilityTarget, resolve_visibility},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
  pub student_profile_id: String,
  pub profile:            StudentProfile,
  pub subjects_in_scope:  SubjectScope,
}

/// Load the `class_id` partition and keep the profiles `assignments` cover,
/// ordered by profile id.
pub async fn visible_students<S>(
  store: &S,
  assignments: &[Assignment],
  class_id: &str,
) -> Result<Vec<RosterEntry>>
where
  S: DocumentStore + ?Sized,
{
  let collection = paths::student_profiles(class_id);
  let mut roster = Vec::new();
  for (id, data) in store.list_documents(&collection).await? {
    let profile: StudentProfile = store::from_document(&collection.doc(id.as_str()), data)?;
    let visibility = resolve_visibility(assignments, &VisibilityTarget::from(&profile))?;
    if visibility.visible {
      roster.push(RosterEntry {
        student_profile_id: id,
        profile,
        subjects_in_scope: visibility.subjects_in_scope,
      });
    }
  }
  Ok(roster)
}
