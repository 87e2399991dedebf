//! Saga tests against the in-memory collaborators.

use std::{sync::Arc, time::Duration};

use chrono::{Datelike as _, Utc};

use super::*;
use crate::testing::{MemoryDirectory, MemoryStore};

type Coordinator = ProvisioningCoordinator<MemoryDirectory, MemoryStore>;

fn setup() -> (Arc<MemoryDirectory>, Arc<MemoryStore>, Coordinator) {
  let directory = Arc::new(MemoryDirectory::default());
  let store = Arc::new(MemoryStore::default());
  let coordinator = ProvisioningCoordinator::new(directory.clone(), store.clone(), "school.test");
  (directory, store, coordinator)
}

fn teacher(email: &str) -> ProvisionRequest {
  ProvisionRequest {
    display_name: "Meera Nair".into(),
    login:        LoginSpec::Supplied { email: email.into() },
    password:     None,
    profile:      RoleInput::Teacher(TeacherInput {
      subjects_qualified: vec!["Maths".into()],
      monthly_salary: Some(42_000),
      ..Default::default()
    }),
  }
}

fn student(admission: &str) -> ProvisionRequest {
  ProvisionRequest {
    display_name: "Ravi Kumar".into(),
    login:        LoginSpec::Derived { business_key: admission.into(), year: Some(2025) },
    password:     Some("s3cret-pass".into()),
    profile:      RoleInput::Student(StudentInput {
      admission_number: admission.into(),
      class_id: "10".into(),
      section_id: Some("A".into()),
      ..Default::default()
    }),
  }
}

// ─── Happy paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_gets_account_record_and_profile() {
  let (directory, store, coordinator) = setup();

  let done = coordinator.provision(teacher("T@X.com ")).await.unwrap();
  assert_eq!(done.login_email, "t@x.com");
  assert_eq!(done.role, Role::Teacher);
  assert_eq!(
    done.generated_password.as_deref(),
    Some(format!("Teacher@{}", Utc::now().year()).as_str())
  );

  assert!(directory.has_account(&done.account_id));
  let record = store.get(&format!("users/{}", done.account_id)).unwrap();
  assert_eq!(record["role"], "Teacher");
  assert_eq!(record["status"], "Active");
  let profile = store.get(&format!("teachers/{}", done.account_id)).unwrap();
  assert_eq!(profile["currentSalary"], 42_000);
  assert_eq!(profile["salaryHistory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn coordinator_profile_lands_in_its_own_collection() {
  let (_directory, store, coordinator) = setup();
  let request = ProvisionRequest {
    display_name: "Lata Iyer".into(),
    login:        LoginSpec::Supplied { email: "lata@school.test".into() },
    password:     None,
    profile:      RoleInput::Coordinator(CoordinatorInput {
      department: Some("Primary".into()),
      ..Default::default()
    }),
  };

  let done = coordinator.provision(request).await.unwrap();
  let profile = store.get(&format!("coordinators/{}", done.account_id)).unwrap();
  assert_eq!(profile["department"], "Primary");
  assert!(store.get(&format!("teachers/{}", done.account_id)).is_none());
}

#[tokio::test]
async fn default_password_follows_the_login_year() {
  let (directory, _store, coordinator) = setup();
  let mut request = student("ADM-9");
  request.login = LoginSpec::Derived { business_key: "ADM-9".into(), year: Some(2019) };
  request.password = None;
  assert_eq!(request.pending_password(Utc::now()).as_deref(), Some("Student@2019"));

  let done = coordinator.provision(request).await.unwrap();
  assert_eq!(done.login_email, "adm9.student2019@school.test");
  assert_eq!(done.generated_password.as_deref(), Some("Student@2019"));
  assert!(directory.has_account(&done.account_id));
}

#[tokio::test]
async fn student_is_linked_to_its_class_partition() {
  let (_directory, store, coordinator) = setup();

  let done = coordinator.provision(student("ADM-117")).await.unwrap();
  assert_eq!(done.login_email, "adm117.student2025@school.test");
  assert_eq!(done.generated_password, None);

  let profile_id = done.student_profile_id.clone().unwrap();
  let record = store.get(&format!("users/{}", done.account_id)).unwrap();
  assert_eq!(record["classId"], "10");
  assert_eq!(record["studentProfileId"], profile_id.as_str());

  let profile = store
    .get(&format!("students/10/profiles/{profile_id}"))
    .unwrap();
  assert_eq!(profile["admissionNumber"], "ADM-117");
  assert_eq!(profile["accountId"], done.account_id.as_str());
}

// ─── Rejections before any state exists ──────────────────────────────────────

#[tokio::test]
async fn duplicate_email_creates_nothing_new() {
  let (directory, store, coordinator) = setup();
  coordinator.provision(teacher("t@x.com")).await.unwrap();
  let before = store.snapshot();

  let err = coordinator.provision(teacher("t@x.com")).await.unwrap_err();
  assert!(matches!(err, ProvisionError::DuplicateIdentity { ref email } if email == "t@x.com"));
  assert_eq!(directory.len(), 1);
  assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn concurrent_duplicates_produce_one_account() {
  let (directory, _store, coordinator) = setup();
  let coordinator = Arc::new(coordinator);

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let coordinator = coordinator.clone();
      tokio::spawn(async move { coordinator.provision(teacher("race@x.com")).await })
    })
    .collect();

  let mut ok = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => ok += 1,
      Err(ProvisionError::DuplicateIdentity { .. }) => {}
      Err(other) => panic!("unexpected {other:?}"),
    }
  }
  assert_eq!(ok, 1);
  assert_eq!(directory.len(), 1);
}

#[tokio::test]
async fn weak_and_invalid_credentials_are_surfaced_verbatim() {
  let (directory, store, coordinator) = setup();

  let mut weak = teacher("w@x.com");
  weak.password = Some("123".into());
  assert!(matches!(
    coordinator.provision(weak).await,
    Err(ProvisionError::WeakCredential(_))
  ));

  assert!(matches!(
    coordinator.provision(teacher("not-an-email")).await,
    Err(ProvisionError::InvalidIdentity(_))
  ));

  assert_eq!(directory.len(), 0);
  assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn unusable_payloads_are_rejected_up_front() {
  let (directory, _store, coordinator) = setup();

  let mut nameless = teacher("n@x.com");
  nameless.display_name = "  ".into();
  assert!(matches!(
    coordinator.provision(nameless).await,
    Err(ProvisionError::InvalidProfile(_))
  ));

  let mut classless = student("ADM-1");
  if let RoleInput::Student(input) = &mut classless.profile {
    input.class_id.clear();
  }
  assert!(matches!(
    coordinator.provision(classless).await,
    Err(ProvisionError::InvalidProfile(_))
  ));
  assert_eq!(directory.len(), 0);
}

// ─── Compensation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_role_profile_rolls_back_record_and_account() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("teachers/");

  let err = coordinator.provision(teacher("t@x.com")).await.unwrap_err();
  assert!(matches!(
    err,
    ProvisionError::DocumentWriteFailed { step: SagaStep::RoleProfile, .. }
  ));
  assert!(err.is_clean());
  assert_eq!(directory.len(), 0);
  assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn failed_user_record_rolls_back_account() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("users/");

  let err = coordinator.provision(teacher("t@x.com")).await.unwrap_err();
  assert!(matches!(
    err,
    ProvisionError::DocumentWriteFailed { step: SagaStep::UserRecord, .. }
  ));
  assert_eq!(directory.len(), 0);
  assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn failed_student_profile_rolls_back() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("students/");

  let err = coordinator.provision(student("ADM-9")).await.unwrap_err();
  assert!(matches!(
    err,
    ProvisionError::DocumentWriteFailed { step: SagaStep::StudentProfile, .. }
  ));
  assert_eq!(directory.len(), 0);
  assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn email_is_reusable_after_rollback() {
  let (_directory, store, coordinator) = setup();
  store.fail_writes_under("teachers/");
  coordinator.provision(teacher("t@x.com")).await.unwrap_err();

  store.heal();
  assert!(coordinator.provision(teacher("t@x.com")).await.is_ok());
}

#[tokio::test]
async fn stuck_account_delete_names_the_orphan() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("teachers/");
  directory.fail_deletes();

  let err = coordinator.provision(teacher("t@x.com")).await.unwrap_err();
  let ProvisionError::ManualCleanupRequired { account_id, email, step, leftovers, .. } = err else {
    panic!("expected manual cleanup, got {err:?}");
  };
  assert_eq!(email, "t@x.com");
  assert_eq!(step, SagaStep::RoleProfile);
  assert_eq!(leftovers, vec![Leftover::Account(account_id.clone())]);
  assert!(directory.has_account(&account_id));
  // The record delete still ran.
  assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn stuck_document_delete_still_removes_the_account() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("teachers/");
  store.fail_deletes();

  let err = coordinator.provision(teacher("t@x.com")).await.unwrap_err();
  let ProvisionError::ManualCleanupRequired { account_id, leftovers, .. } = err else {
    panic!("expected manual cleanup, got {err:?}");
  };
  assert_eq!(leftovers, vec![Leftover::Document(format!("users/{account_id}"))]);
  assert_eq!(directory.len(), 0);
}

#[tokio::test]
async fn rollback_finishes_after_the_caller_gives_up() {
  let (directory, store, coordinator) = setup();
  store.fail_writes_under("teachers/");
  directory.delay_deletes(Duration::from_millis(100));

  let waited = tokio::time::timeout(
    Duration::from_millis(10),
    coordinator.provision(teacher("t@x.com")),
  )
  .await;
  assert!(waited.is_err(), "caller should have timed out mid-rollback");
  assert_eq!(directory.len(), 1);

  tokio::time::sleep(Duration::from_millis(400)).await;
  assert_eq!(directory.len(), 0);
  assert_eq!(store.len(), 0);
}

/// Every reachable end state is all-present, all-absent, or a named orphan.
#[tokio::test]
async fn every_failure_mix_ends_in_an_allowed_state() {
  let write_failures = [None, Some("users/"), Some("teachers/")];
  for write_failure in write_failures {
    for (stuck_docs, stuck_account) in [(false, false), (true, false), (false, true), (true, true)] {
      let (directory, store, coordinator) = setup();
      if let Some(prefix) = write_failure {
        store.fail_writes_under(prefix);
      }
      if stuck_docs {
        store.fail_deletes();
      }
      if stuck_account {
        directory.fail_deletes();
      }

      match coordinator.provision(teacher("p@x.com")).await {
        Ok(done) => {
          assert!(directory.has_account(&done.account_id));
          assert!(store.get(&format!("users/{}", done.account_id)).is_some());
          assert!(store.get(&format!("teachers/{}", done.account_id)).is_some());
        }
        Err(ProvisionError::DocumentWriteFailed { .. }) => {
          assert_eq!(directory.len(), 0);
          assert_eq!(store.len(), 0);
        }
        Err(ProvisionError::ManualCleanupRequired { leftovers, .. }) => {
          assert!(!leftovers.is_empty());
        }
        Err(other) => panic!("unexpected {other:?}"),
      }
    }
  }
}
