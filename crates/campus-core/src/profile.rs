//! Role profiles and student profiles.
//!
//! A Teacher or Coordinator owns a role profile keyed by the same account id
//! as their user record. A Student owns a [`StudentProfile`] stored in the
//! partition of their class.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{account::AccountId, appraisal::AppraisalStatus};

/// Contact details kept on HR profiles. `email` is a personal contact address,
/// distinct from the login email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
  pub phone:   Option<String>,
  pub email:   Option<String>,
  pub address: Option<String>,
}

/// One entry in a staff member's salary history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryEntry {
  pub monthly_amount: u64,
  pub effective_from: DateTime<Utc>,
  /// The appraisal request that produced this entry, if any.
  #[serde(default)]
  pub appraisal_id:   Option<String>,
}

/// The `teachers/{accountId}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
  pub account_id:         AccountId,
  pub name:               String,
  #[serde(default)]
  pub contact:            ContactInfo,
  #[serde(default)]
  pub subjects_qualified: Vec<String>,
  pub qualification:      Option<String>,
  pub joining_date:       Option<NaiveDate>,
  pub current_salary:     Option<u64>,
  #[serde(default)]
  pub salary_history:     Vec<SalaryEntry>,
  pub appraisal_status:   Option<AppraisalStatus>,
}

/// The `coordinators/{accountId}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorProfile {
  pub account_id:     AccountId,
  pub name:           String,
  #[serde(default)]
  pub contact:        ContactInfo,
  /// The wing or department coordinated, e.g. "Primary".
  pub department:     Option<String>,
  pub joining_date:   Option<NaiveDate>,
  pub current_salary: Option<u64>,
  #[serde(default)]
  pub salary_history: Vec<SalaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scholarship {
  pub name:   String,
  pub amount: u64,
  pub year:   i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
  pub exam:           String,
  pub subject:        String,
  pub marks_obtained: f32,
  pub max_marks:      f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
  pub days_present: u32,
  pub days_total:   u32,
}

/// The `students/{classId}/profiles/{studentProfileId}` document.
///
/// `class_id`, `section_id` and `group_id` mirror the linkage on the student's
/// user record and are what visibility resolution matches against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
  pub account_id:       AccountId,
  pub name:             String,
  pub admission_number: String,
  pub class_id:         String,
  pub section_id:       Option<String>,
  pub group_id:         Option<String>,
  pub guardian_name:    Option<String>,
  pub guardian_phone:   Option<String>,
  pub date_of_birth:    Option<NaiveDate>,
  #[serde(default)]
  pub scholarships:     Vec<Scholarship>,
  #[serde(default)]
  pub exam_records:     Vec<ExamRecord>,
  #[serde(default)]
  pub attendance:       Attendance,
}
