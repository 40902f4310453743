//! User profile creation and the assembled profile read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  EntityKind, Error, Result,
  hierarchy::{HierarchyResolver, TraversalLimits},
  id::{CompetencyId, UserId},
  normalize::Normalizer,
  progress::ProficiencyLevel,
  skill::{Skill, validate_name},
  store::{ProfileStore, TaxonomyStore},
  taxonomy::TaxonomyService,
  user::{NewUser, User},
};

/// One competency as shown on a user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyProfile {
  pub competency_id:         CompetencyId,
  pub competency_name:       String,
  pub coverage_percentage:   f64,
  pub proficiency_level:     ProficiencyLevel,
  pub l1_skills:             Vec<Skill>,
  pub verified_skills_count: usize,
  pub total_required_mgs:    usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:         UserId,
  pub user_name:       String,
  pub company_id:      String,
  pub relevance_score: f64,
  pub competencies:    Vec<CompetencyProfile>,
  pub last_updated:    DateTime<Utc>,
}

/// Result of [`ProfileService::create_profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProfile {
  pub user:         User,
  /// Competencies seeded from the raw profile data.
  pub competencies: Vec<CompetencyId>,
  /// Extracted names that matched no competency.
  pub unresolved:   Vec<String>,
}

pub struct ProfileService<'a, T, P, N> {
  taxonomy:   &'a T,
  profiles:   &'a P,
  normalizer: &'a N,
  limits:     TraversalLimits,
}

impl<'a, T, P, N> ProfileService<'a, T, P, N>
where
  T: TaxonomyStore,
  P: ProfileStore,
  N: Normalizer,
{
  pub fn new(taxonomy: &'a T, profiles: &'a P, normalizer: &'a N) -> Self {
    Self {
      taxonomy,
      profiles,
      normalizer,
      limits: TraversalLimits::default(),
    }
  }

  #[must_use]
  pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
    self.limits = limits;
    self
  }

  /// Create or update a user.
  ///
  /// When `raw_data` is present its competencies are extracted first; an
  /// extraction failure aborts before the user is written. Each extracted
  /// name that resolves to a competency gets an empty progress record.
  pub async fn create_profile(&self, new_user: NewUser) -> Result<CreatedProfile> {
    validate_name("user_name", &new_user.user_name)?;
    validate_name("company_id", &new_user.company_id)?;

    let extracted = match new_user.raw_data.as_deref().map(str::trim) {
      Some(raw) if !raw.is_empty() => {
        self.normalizer.extract_competencies(raw).await?
      }
      _ => Vec::new(),
    };

    let user = self
      .profiles
      .upsert_user(new_user)
      .await
      .map_err(Error::store)?;

    let taxonomy = TaxonomyService::new(self.taxonomy, self.normalizer)
      .with_limits(self.limits);
    let mut competencies: Vec<CompetencyId> = Vec::new();
    let mut unresolved = Vec::new();
    for name in extracted {
      if name.trim().is_empty() {
        continue;
      }
      let Some(competency) = taxonomy.find_competency(&name).await? else {
        debug!(user_id = %user.user_id, %name, "extracted competency not in taxonomy");
        unresolved.push(name);
        continue;
      };
      if competencies.contains(&competency.competency_id) {
        continue;
      }
      self
        .profiles
        .create_user_competency(&user.user_id, &competency.competency_id)
        .await
        .map_err(Error::store)?;
      competencies.push(competency.competency_id);
    }

    info!(
      user_id = %user.user_id,
      seeded = competencies.len(),
      unresolved = unresolved.len(),
      "profile created"
    );
    Ok(CreatedProfile { user, competencies, unresolved })
  }

  pub async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile> {
    let user = self
      .profiles
      .get_user_by_id(user_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::User, user_id))?;

    let held = self
      .profiles
      .get_user_competencies(user_id)
      .await
      .map_err(Error::store)?;
    let resolver = HierarchyResolver::new(self.taxonomy).with_limits(self.limits);

    let mut competencies = Vec::with_capacity(held.len());
    for progress in held {
      let Some(competency) = self
        .taxonomy
        .get_competency_by_id(&progress.competency_id)
        .await
        .map_err(Error::store)?
      else {
        warn!(
          %user_id,
          competency_id = %progress.competency_id,
          "user competency refers to a missing competency"
        );
        continue;
      };

      let l1_skills = self
        .taxonomy
        .get_l1_skills_for_competency(&competency.competency_id)
        .await
        .map_err(Error::store)?;
      let required = resolver
        .resolve_mgs_for_competency(&competency.competency_id)
        .await?;

      competencies.push(CompetencyProfile {
        verified_skills_count: required.count_verified(&progress.verified_ids()),
        total_required_mgs: required.len(),
        competency_id: competency.competency_id,
        competency_name: competency.competency_name,
        coverage_percentage: progress.coverage_percentage,
        proficiency_level: progress.proficiency_level.unwrap_or_default(),
        l1_skills,
      });
    }

    Ok(UserProfile {
      user_id: user.user_id,
      user_name: user.user_name,
      company_id: user.company_id,
      relevance_score: user.relevance_score,
      competencies,
      last_updated: user.updated_at,
    })
  }
}
