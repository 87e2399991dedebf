//! Assignment-based visibility resolution.
//!
//! Decides whether a teacher may see or act on a record and which subjects
//! are in scope for that interaction. Resolution is a pure function of the
//! assignment list and the target: no I/O, no caching, and the result does
//! not depend on the order of the assignments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  assignment::{Assignment, AssignmentKind, non_empty},
  profile::StudentProfile,
};

/// The placement of the record being checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityTarget {
  pub class_id:   String,
  #[serde(default)]
  pub section_id: Option<String>,
  #[serde(default)]
  pub group_id:   Option<String>,
}

impl From<&StudentProfile> for VisibilityTarget {
  fn from(profile: &StudentProfile) -> Self {
    Self {
      class_id:   profile.class_id.clone(),
      section_id: profile.section_id.clone(),
      group_id:   profile.group_id.clone(),
    }
  }
}

/// Subjects a teacher may act on for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "subjects", rename_all = "snake_case")]
pub enum SubjectScope {
  /// Homeroom authority over every subject of the class.
  All,
  Subjects(BTreeSet<String>),
}

impl Default for SubjectScope {
  fn default() -> Self { Self::Subjects(BTreeSet::new()) }
}

impl SubjectScope {
  pub fn contains(&self, subject: &str) -> bool {
    match self {
      Self::All => true,
      Self::Subjects(set) => set.contains(subject),
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Subjects(set) if set.is_empty())
  }

  fn absorb(&mut self, other: SubjectScope) {
    match other {
      Self::All => *self = Self::All,
      Self::Subjects(theirs) => {
        if let Self::Subjects(mine) = self {
          mine.extend(theirs);
        }
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
  pub visible:           bool,
  pub subjects_in_scope: SubjectScope,
}

impl Visibility {
  pub fn hidden() -> Self {
    Self { visible: false, subjects_in_scope: SubjectScope::default() }
  }
}

/// Whether a single assignment covers `target`.
fn matches(assignment: &Assignment, target: &VisibilityTarget) -> bool {
  if assignment.class_id != target.class_id {
    return false;
  }
  let (required, actual) = if assignment.kind.is_programme() {
    (non_empty(&assignment.group_id), non_empty(&target.group_id))
  } else {
    (non_empty(&assignment.section_id), non_empty(&target.section_id))
  };
  // No refinement means a full-class grant.
  required.is_none_or(|required| actual == Some(required))
}

/// The subjects a matching assignment grants.
fn grant(assignment: &Assignment) -> SubjectScope {
  match assignment.kind {
    AssignmentKind::ClassTeacher | AssignmentKind::MotherTeacher => SubjectScope::All,
    AssignmentKind::SubjectTeacher => SubjectScope::Subjects(
      non_empty(&assignment.subject_id)
        .map(str::to_owned)
        .into_iter()
        .collect(),
    ),
    kind @ (AssignmentKind::NiosTeacher | AssignmentKind::NclpTeacher) => SubjectScope::Subjects(
      kind.programme_subjects().iter().map(|s| (*s).to_owned()).collect(),
    ),
  }
}

/// Resolve `target` against `assignments`.
///
/// Visible if any assignment matches; the scope is the union over all
/// matching assignments. A non-match is a normal outcome, never an error.
/// Only structurally malformed assignments fail.
pub fn resolve_visibility(
  assignments: &[Assignment],
  target: &VisibilityTarget,
) -> Result<Visibility> {
  for assignment in assignments {
    assignment.check_shape()?;
  }

  let mut result = Visibility::hidden();
  for assignment in assignments.iter().filter(|a| matches(a, target)) {
    result.visible = true;
    result.subjects_in_scope.absorb(grant(assignment));
  }
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Error, assignment::NIOS_SUBJECTS};

  fn assignment(
    id: &str,
    kind: AssignmentKind,
    class: &str,
    section: Option<&str>,
    subject: Option<&str>,
    group: Option<&str>,
  ) -> Assignment {
    Assignment {
      id:         id.into(),
      kind,
      class_id:   class.into(),
      section_id: section.map(Into::into),
      subject_id: subject.map(Into::into),
      group_id:   group.map(Into::into),
    }
  }

  fn target(class: &str, section: Option<&str>, group: Option<&str>) -> VisibilityTarget {
    VisibilityTarget {
      class_id:   class.into(),
      section_id: section.map(Into::into),
      group_id:   group.map(Into::into),
    }
  }

  fn subjects(names: &[&str]) -> SubjectScope {
    SubjectScope::Subjects(names.iter().map(|s| (*s).to_owned()).collect())
  }

  #[test]
  fn subject_teacher_does_not_see_other_sections() {
    let assignments = [assignment(
      "a",
      AssignmentKind::SubjectTeacher,
      "10",
      Some("A"),
      Some("Maths"),
      None,
    )];
    let result = resolve_visibility(&assignments, &target("10", Some("B"), None)).unwrap();
    assert!(!result.visible);
    assert!(result.subjects_in_scope.is_empty());
  }

  #[test]
  fn subject_teacher_is_narrow() {
    let assignments = [assignment(
      "a",
      AssignmentKind::SubjectTeacher,
      "10",
      Some("A"),
      Some("Maths"),
      None,
    )];
    let inside = resolve_visibility(&assignments, &target("10", Some("A"), None)).unwrap();
    assert!(inside.visible);
    assert_eq!(inside.subjects_in_scope, subjects(&["Maths"]));

    for other in ["9", "11", "10A"] {
      let outside = resolve_visibility(&assignments, &target(other, Some("A"), None)).unwrap();
      assert!(!outside.visible, "class {other} should be hidden");
    }
  }

  #[test]
  fn sectionless_class_teacher_sees_the_whole_class() {
    let assignments = [assignment("a", AssignmentKind::ClassTeacher, "10", None, None, None)];
    for section in [Some("A"), Some("B"), Some("Z"), None] {
      let result = resolve_visibility(&assignments, &target("10", section, None)).unwrap();
      assert!(result.visible);
      assert_eq!(result.subjects_in_scope, SubjectScope::All);
    }
    assert!(!resolve_visibility(&assignments, &target("9", None, None)).unwrap().visible);
  }

  #[test]
  fn mother_teacher_is_section_scoped_when_given_one() {
    let assignments = [assignment("a", AssignmentKind::MotherTeacher, "1", Some("A"), None, None)];
    assert!(resolve_visibility(&assignments, &target("1", Some("A"), None)).unwrap().visible);
    assert!(!resolve_visibility(&assignments, &target("1", Some("B"), None)).unwrap().visible);
    assert!(!resolve_visibility(&assignments, &target("1", None, None)).unwrap().visible);
  }

  #[test]
  fn programme_teachers_scope_by_group() {
    let assignments = [assignment(
      "a",
      AssignmentKind::NiosTeacher,
      "10",
      Some("A"),
      None,
      Some("G1"),
    )];
    // Section is irrelevant for programme kinds.
    let hit = resolve_visibility(&assignments, &target("10", Some("B"), Some("G1"))).unwrap();
    assert!(hit.visible);
    assert_eq!(hit.subjects_in_scope, subjects(NIOS_SUBJECTS));

    let miss = resolve_visibility(&assignments, &target("10", Some("A"), Some("G2"))).unwrap();
    assert!(!miss.visible);
  }

  #[test]
  fn groupless_programme_assignment_is_a_full_class_grant() {
    let assignments = [assignment("a", AssignmentKind::NclpTeacher, "7", None, None, None)];
    let result = resolve_visibility(&assignments, &target("7", None, Some("any"))).unwrap();
    assert!(result.visible);
    assert!(result.subjects_in_scope.contains("Numeracy"));
    assert!(!result.subjects_in_scope.contains("Maths"));
  }

  #[test]
  fn blank_refinements_count_as_unspecified() {
    let assignments = [assignment(
      "a",
      AssignmentKind::SubjectTeacher,
      "10",
      Some(""),
      Some("Maths"),
      None,
    )];
    assert!(resolve_visibility(&assignments, &target("10", Some("C"), None)).unwrap().visible);
  }

  #[test]
  fn scope_is_the_union_of_matches() {
    let assignments = [
      assignment("a", AssignmentKind::SubjectTeacher, "10", Some("A"), Some("Maths"), None),
      assignment("b", AssignmentKind::SubjectTeacher, "10", None, Some("Physics"), None),
      assignment("c", AssignmentKind::SubjectTeacher, "10", Some("B"), Some("Chemistry"), None),
    ];
    let result = resolve_visibility(&assignments, &target("10", Some("A"), None)).unwrap();
    assert_eq!(result.subjects_in_scope, subjects(&["Maths", "Physics"]));
  }

  #[test]
  fn homeroom_absorbs_narrow_grants() {
    let assignments = [
      assignment("a", AssignmentKind::SubjectTeacher, "10", Some("A"), Some("Maths"), None),
      assignment("b", AssignmentKind::ClassTeacher, "10", Some("A"), None, None),
    ];
    let result = resolve_visibility(&assignments, &target("10", Some("A"), None)).unwrap();
    assert_eq!(result.subjects_in_scope, SubjectScope::All);
  }

  #[test]
  fn result_is_independent_of_assignment_order() {
    let mut assignments = vec![
      assignment("a", AssignmentKind::SubjectTeacher, "10", Some("A"), Some("Maths"), None),
      assignment("b", AssignmentKind::NiosTeacher, "10", None, None, Some("G1")),
      assignment("c", AssignmentKind::SubjectTeacher, "10", None, Some("Art"), None),
      assignment("d", AssignmentKind::ClassTeacher, "9", None, None, None),
    ];
    let probe = target("10", Some("A"), Some("G1"));
    let expected = resolve_visibility(&assignments, &probe).unwrap();

    for _ in 0..assignments.len() {
      assignments.rotate_left(1);
      assert_eq!(resolve_visibility(&assignments, &probe).unwrap(), expected);
      assignments.reverse();
      assert_eq!(resolve_visibility(&assignments, &probe).unwrap(), expected);
    }
  }

  #[test]
  fn no_assignments_means_nothing_visible() {
    let result = resolve_visibility(&[], &target("10", Some("A"), None)).unwrap();
    assert_eq!(result, Visibility::hidden());
  }

  #[test]
  fn malformed_assignment_is_an_error() {
    let assignments = [assignment("a", AssignmentKind::ClassTeacher, "", None, None, None)];
    assert!(matches!(
      resolve_visibility(&assignments, &target("10", None, None)),
      Err(Error::InvalidAssignmentConfiguration(_))
    ));
  }

  #[test]
  fn scope_serialises_with_a_kind_tag() {
    assert_eq!(
      serde_json::to_value(SubjectScope::All).unwrap(),
      serde_json::json!({ "kind": "all" })
    );
    assert_eq!(
      serde_json::to_value(subjects(&["Maths"])).unwrap(),
      serde_json::json!({ "kind": "subjects", "subjects": ["Maths"] })
    );
  }
}
