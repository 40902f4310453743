//! JSON REST API for skillgap.
//!
//! Exposes an axum [`Router`] over any store implementing both
//! [`TaxonomyStore`] and [`ProfileStore`]. Auth, TLS and transport concerns
//! are the caller's responsibility.
//!
//! Every response is enveloped: `{"success": true, "data": .., "timestamp"}`
//! on success, `{"success": false, "error": {"code", "message"}, "timestamp"}`
//! on failure.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", skillgap_api::api_router(AppState::new(store, normalizer)))
//! ```

pub mod competencies;
pub mod envelope;
pub mod error;
pub mod skills;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use skillgap_core::{
  hierarchy::TraversalLimits,
  normalize::Normalizer,
  store::{ProfileStore, TaxonomyStore},
};

pub use error::ApiError;

/// A backend serving both halves of the store surface.
pub trait SkillgapStore: TaxonomyStore + ProfileStore + 'static {}

impl<T: TaxonomyStore + ProfileStore + 'static> SkillgapStore for T {}

/// Shared handler state.
pub struct AppState<S, N> {
  pub store:      Arc<S>,
  pub normalizer: Arc<N>,
  pub limits:     TraversalLimits,
}

impl<S, N> AppState<S, N> {
  pub fn new(store: Arc<S>, normalizer: Arc<N>) -> Self {
    Self { store, normalizer, limits: TraversalLimits::default() }
  }

  #[must_use]
  pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
    self.limits = limits;
    self
  }
}

// Derived Clone would demand `S: Clone` and `N: Clone`.
impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      normalizer: Arc::clone(&self.normalizer),
      limits:     self.limits,
    }
  }
}

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(state: AppState<S, N>) -> Router<()>
where
  S: SkillgapStore,
  N: Normalizer + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S, N>))
    .route("/users/{user_id}/profile", get(users::profile::<S, N>))
    .route("/users/{user_id}/gaps", get(users::gaps::<S, N>))
    .route("/users/{user_id}/assessments", post(users::assessment::<S, N>))
    .route(
      "/users/{user_id}/competencies/{competency_id}/coverage",
      post(users::coverage::<S, N>),
    )
    .route("/users/{user_id}/relevance", post(users::relevance::<S, N>))
    // Skills
    .route("/skills", post(skills::create::<S, N>))
    .route("/skills/mgs-counts", get(skills::mgs_counts::<S, N>))
    .route(
      "/skills/{skill_id}",
      get(skills::get_one::<S, N>).delete(skills::delete_one::<S, N>),
    )
    .route("/skills/{skill_id}/parent", put(skills::set_parent::<S, N>))
    .route("/skills/{skill_id}/mgs", get(skills::mgs::<S, N>))
    // Competencies
    .route("/competencies", post(competencies::create::<S, N>))
    .route("/competencies/mgs", get(competencies::mgs_by_name::<S, N>))
    .route(
      "/competencies/{competency_id}",
      get(competencies::get_one::<S, N>).delete(competencies::delete_one::<S, N>),
    )
    .route(
      "/competencies/{competency_id}/parent",
      put(competencies::set_parent::<S, N>),
    )
    .route("/competencies/{competency_id}/mgs", get(competencies::mgs::<S, N>))
    .route(
      "/competencies/{competency_id}/skills",
      get(competencies::skills::<S, N>).post(competencies::link_skill::<S, N>),
    )
    .with_state(state)
}
