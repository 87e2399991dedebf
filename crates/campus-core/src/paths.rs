//! Where each document kind lives in the store.

use crate::{
  account::AccountId,
  store::{CollectionPath, DocumentPath},
};

pub const USERS: &str = "users";
pub const TEACHERS: &str = "teachers";
pub const COORDINATORS: &str = "coordinators";
pub const STUDENTS: &str = "students";
pub const APPRAISAL_REQUESTS: &str = "appraisalRequests";

pub fn user(id: &AccountId) -> DocumentPath {
  CollectionPath::new(USERS).doc(id.as_str())
}

pub fn teacher_profile(id: &AccountId) -> DocumentPath {
  CollectionPath::new(TEACHERS).doc(id.as_str())
}

pub fn coordinator_profile(id: &AccountId) -> DocumentPath {
  CollectionPath::new(COORDINATORS).doc(id.as_str())
}

/// The per-class partition `students/{classId}/profiles`.
pub fn student_profiles(class_id: &str) -> CollectionPath {
  CollectionPath::new(STUDENTS).doc(class_id).child("profiles")
}

pub fn student_profile(class_id: &str, profile_id: &str) -> DocumentPath {
  student_profiles(class_id).doc(profile_id)
}

pub fn remarks(class_id: &str, profile_id: &str) -> CollectionPath {
  student_profile(class_id, profile_id).child("remarks")
}

/// A teacher's assignment arena, nested under their user record so that the
/// whole list can be replaced in one `users` batch.
pub fn assignments(teacher: &AccountId) -> CollectionPath {
  user(teacher).child("assignments")
}

pub fn appraisal_requests() -> CollectionPath {
  CollectionPath::new(APPRAISAL_REQUESTS)
}

pub fn appraisal_request(id: &str) -> DocumentPath {
  appraisal_requests().doc(id)
}
