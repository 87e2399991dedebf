//! JSON REST API for Campus.
//!
//! Exposes an axum [`Router`] over any [`IdentityDirectory`] and
//! [`DocumentStore`]. Every route authenticates with HTTP Basic against the
//! directory; TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", campus_api::api_router(state))
//! ```

pub mod appraisals;
pub mod assignments;
pub mod auth;
pub mod error;
pub mod provisioning;
pub mod remarks;
pub mod session;
pub mod users;
pub mod visibility;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post, put},
};
use campus_core::{
  appraisal::AppraisalWorkflow, assignment::AssignmentRegistry, catalog::SchoolCatalog,
  directory::IdentityDirectory, provision::ProvisioningCoordinator, remarks::RemarkBook,
  store::DocumentStore,
};

pub use error::ApiError;

/// Deployment settings the API needs beyond its two backends.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// Domain used for derived login emails.
  pub email_domain:      String,
  /// How long `POST /provision` waits before answering `202 Accepted`.
  pub provision_timeout: Duration,
  pub catalog:           SchoolCatalog,
}

/// Shared state threaded through all handlers.
pub struct AppState<D, S> {
  pub directory:         Arc<D>,
  pub store:             Arc<S>,
  pub catalog:           Arc<SchoolCatalog>,
  pub provisioning:      Arc<ProvisioningCoordinator<D, S>>,
  pub assignments:       Arc<AssignmentRegistry<S>>,
  pub appraisals:        Arc<AppraisalWorkflow<S>>,
  pub remarks:           Arc<RemarkBook<S>>,
  pub provision_timeout: Duration,
}

// Manual impl: the backends themselves need not be `Clone`.
impl<D, S> Clone for AppState<D, S> {
  fn clone(&self) -> Self {
    Self {
      directory:         self.directory.clone(),
      store:             self.store.clone(),
      catalog:           self.catalog.clone(),
      provisioning:      self.provisioning.clone(),
      assignments:       self.assignments.clone(),
      appraisals:        self.appraisals.clone(),
      remarks:           self.remarks.clone(),
      provision_timeout: self.provision_timeout,
    }
  }
}

impl<D, S> AppState<D, S>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  pub fn new(directory: Arc<D>, store: Arc<S>, settings: ApiSettings) -> Self {
    let catalog = Arc::new(settings.catalog);
    Self {
      provisioning: Arc::new(ProvisioningCoordinator::new(
        directory.clone(),
        store.clone(),
        settings.email_domain,
      )),
      assignments: Arc::new(AssignmentRegistry::new(store.clone(), catalog.clone())),
      appraisals: Arc::new(AppraisalWorkflow::new(store.clone())),
      remarks: Arc::new(RemarkBook::new(store.clone())),
      provision_timeout: settings.provision_timeout,
      directory,
      store,
      catalog,
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D, S>(state: AppState<D, S>) -> Router<()>
where
  D: IdentityDirectory + 'static,
  S: DocumentStore + 'static,
{
  Router::new()
    .route("/session", post(session::open::<D, S>))
    .route("/provision", post(provisioning::provision::<D, S>))
    // Users
    .route("/users/{id}", get(users::get_one::<D, S>))
    .route("/users/{id}/status", put(users::set_status::<D, S>))
    // Assignments
    .route(
      "/teachers/{id}/assignments",
      get(assignments::list::<D, S>)
        .post(assignments::create::<D, S>)
        .put(assignments::replace::<D, S>),
    )
    .route(
      "/teachers/{id}/assignments/{aid}",
      put(assignments::update::<D, S>).delete(assignments::remove::<D, S>),
    )
    // Visibility
    .route("/visibility", post(visibility::resolve::<D, S>))
    .route("/teachers/{id}/students", get(visibility::roster::<D, S>))
    .route("/remarks", post(remarks::create::<D, S>))
    // Appraisals
    .route("/appraisals", post(appraisals::create::<D, S>))
    .route("/appraisals/{id}", get(appraisals::get_one::<D, S>))
    .route("/appraisals/{id}/transition", post(appraisals::transition::<D, S>))
    .route("/appraisals/{id}/reapply", post(appraisals::reapply::<D, S>))
    .with_state(state)
}
