//! The school catalog: classes with their sections, groups, and subjects.
//!
//! Loaded from configuration. It supplies the subject options used to
//! validate assignments and lets callers detect assignments that point at a
//! class, section, or group that no longer exists. Visibility resolution
//! itself never consults it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  assignment::{Assignment, AssignmentKind, non_empty},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
  #[serde(default)]
  pub sections: Vec<String>,
  /// Programme groups (NIOS / NCLP batches) run within the class.
  #[serde(default)]
  pub groups:   Vec<String>,
  #[serde(default)]
  pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolCatalog {
  #[serde(default)]
  pub classes: BTreeMap<String, ClassEntry>,
}

impl SchoolCatalog {
  /// The subjects an assignment of `kind` on `class_id` may name.
  pub fn subject_options(&self, kind: AssignmentKind, class_id: &str) -> Vec<&str> {
    if kind.is_programme() {
      return kind.programme_subjects().to_vec();
    }
    self
      .classes
      .get(class_id)
      .map(|class| class.subjects.iter().map(String::as_str).collect())
      .unwrap_or_default()
  }

  /// Fail with [`Error::StaleVisibilityInput`] if any assignment references
  /// a class, section, or group missing from the catalog.
  pub fn check_current(&self, assignments: &[Assignment]) -> Result<()> {
    for assignment in assignments {
      let Some(class) = self.classes.get(&assignment.class_id) else {
        return Err(Error::StaleVisibilityInput(format!(
          "assignment {} references unknown class {}",
          assignment.id, assignment.class_id
        )));
      };

      if let Some(section) = non_empty(&assignment.section_id)
        && !class.sections.iter().any(|s| s == section)
      {
        return Err(Error::StaleVisibilityInput(format!(
          "assignment {} references unknown section {}-{section}",
          assignment.id, assignment.class_id
        )));
      }

      if let Some(group) = non_empty(&assignment.group_id)
        && !class.groups.iter().any(|g| g == group)
      {
        return Err(Error::StaleVisibilityInput(format!(
          "assignment {} references unknown group {}/{group}",
          assignment.id, assignment.class_id
        )));
      }
    }
    Ok(())
  }
}
