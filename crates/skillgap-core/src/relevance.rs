//! The overall relevance score of a user against their career path.

use tracing::{debug, warn};

use crate::{
  EntityKind, Error, Result,
  coverage::percentage,
  hierarchy::{HierarchyResolver, TraversalLimits},
  id::UserId,
  store::{ProfileStore, TaxonomyStore},
};

pub struct RelevanceScorer<'a, T, P> {
  taxonomy: &'a T,
  profiles: &'a P,
  limits:   TraversalLimits,
}

impl<'a, T, P> RelevanceScorer<'a, T, P>
where
  T: TaxonomyStore,
  P: ProfileStore,
{
  pub fn new(taxonomy: &'a T, profiles: &'a P) -> Self {
    Self { taxonomy, profiles, limits: TraversalLimits::default() }
  }

  #[must_use]
  pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
    self.limits = limits;
    self
  }

  /// Verified over required MGS, summed across every competency the user
  /// holds, as a percentage. Persisted onto the user record.
  ///
  /// A user without a career-path goal scores 0 and nothing is written.
  pub async fn calculate_relevance_score(&self, user_id: &UserId) -> Result<f64> {
    let user = self
      .profiles
      .get_user_by_id(user_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::User, user_id))?;

    if user.career_path_goal().is_none() {
      return Ok(0.0);
    }

    let held = self
      .profiles
      .get_user_competencies(user_id)
      .await
      .map_err(Error::store)?;
    let resolver = HierarchyResolver::new(self.taxonomy).with_limits(self.limits);

    let mut required_total = 0;
    let mut verified_total = 0;
    for progress in &held {
      let required = match resolver
        .resolve_mgs_for_competency(&progress.competency_id)
        .await
      {
        Ok(required) => required,
        Err(Error::NotFound { .. }) => {
          warn!(
            %user_id,
            competency_id = %progress.competency_id,
            "user competency refers to a missing competency"
          );
          continue;
        }
        Err(e) => return Err(e),
      };
      required_total += required.len();
      verified_total += required.count_verified(&progress.verified_ids());
    }

    let score = percentage(verified_total, required_total);
    self
      .profiles
      .update_relevance_score(user_id, score)
      .await
      .map_err(Error::store)?;

    debug!(%user_id, verified_total, required_total, score, "relevance updated");
    Ok(score)
  }
}
