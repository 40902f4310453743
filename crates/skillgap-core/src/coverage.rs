//! Coverage percentage and proficiency level for one (user, competency).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  EntityKind, Error, Result,
  hierarchy::{HierarchyResolver, MgsSet, TraversalLimits},
  id::{CompetencyId, UserId},
  progress::{CompetencyScore, ProficiencyLevel, UserCompetency},
  store::{ProfileStore, SnapshotWrite, TaxonomyStore},
  verification::MAX_SNAPSHOT_ATTEMPTS,
};

/// Round to two decimal places, matching the precision of stored scores.
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

/// `100 * verified / required`, or 0 when nothing is required.
pub fn percentage(verified: usize, required: usize) -> f64 {
  if required == 0 {
    return 0.0;
  }
  round2(100.0 * verified as f64 / required as f64)
}

/// The canonical coverage → proficiency policy.
///
/// | coverage        | level        |
/// |-----------------|--------------|
/// | `pct ≤ 30`      | BEGINNER     |
/// | `30 < pct ≤ 65` | INTERMEDIATE |
/// | `65 < pct ≤ 85` | ADVANCED     |
/// | `85 < pct`      | EXPERT       |
///
/// Total over every `f64`: negatives and NaN land on BEGINNER.
pub fn map_proficiency_level(pct: f64) -> ProficiencyLevel {
  if pct.is_nan() || pct <= 30.0 {
    ProficiencyLevel::Beginner
  } else if pct <= 65.0 {
    ProficiencyLevel::Intermediate
  } else if pct <= 85.0 {
    ProficiencyLevel::Advanced
  } else {
    ProficiencyLevel::Expert
  }
}

/// Coverage of `required` by the verified entries of `progress`.
pub fn score(required: &MgsSet, progress: &UserCompetency) -> (usize, CompetencyScore) {
  let verified = required.count_verified(&progress.verified_ids());
  let coverage_percentage = percentage(verified, required.len());
  (verified, CompetencyScore {
    coverage_percentage,
    proficiency_level: map_proficiency_level(coverage_percentage),
  })
}

/// Result of [`CoverageCalculator::coverage`] and of each competency touched
/// by an assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
  pub user_id:             UserId,
  pub competency_id:       CompetencyId,
  pub required_mgs_count:  usize,
  pub verified_mgs_count:  usize,
  pub coverage_percentage: f64,
  pub proficiency_level:   ProficiencyLevel,
}

impl CoverageReport {
  pub(crate) fn new(
    progress: &UserCompetency,
    required: &MgsSet,
    verified: usize,
    computed: CompetencyScore,
  ) -> Self {
    Self {
      user_id:             progress.user_id.clone(),
      competency_id:       progress.competency_id.clone(),
      required_mgs_count:  required.len(),
      verified_mgs_count:  verified,
      coverage_percentage: computed.coverage_percentage,
      proficiency_level:   computed.proficiency_level,
    }
  }
}

pub struct CoverageCalculator<'a, T, P> {
  taxonomy: &'a T,
  profiles: &'a P,
  limits:   TraversalLimits,
}

impl<'a, T, P> CoverageCalculator<'a, T, P>
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

  /// Recompute coverage and proficiency and write them through to the
  /// user-competency record.
  ///
  /// The write is conditional on the snapshot version that was read. If the
  /// snapshot changed in the meantime it is read again and the score
  /// recomputed, up to [`MAX_SNAPSHOT_ATTEMPTS`] times.
  pub async fn coverage(
    &self,
    user_id: &UserId,
    competency_id: &CompetencyId,
  ) -> Result<CoverageReport> {
    if self
      .profiles
      .get_user_by_id(user_id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::not_found(EntityKind::User, user_id));
    }
    let missing = || {
      Error::not_found(
        EntityKind::UserCompetency,
        format!("{user_id}/{competency_id}"),
      )
    };

    let required = HierarchyResolver::new(self.taxonomy)
      .with_limits(self.limits)
      .resolve_mgs_for_competency(competency_id)
      .await?;

    for attempt in 1..=MAX_SNAPSHOT_ATTEMPTS {
      let progress = self
        .profiles
        .get_user_competency(user_id, competency_id)
        .await
        .map_err(Error::store)?
        .ok_or_else(missing)?;

      let (verified, computed) = score(&required, &progress);

      match self
        .profiles
        .update_user_competency(user_id, competency_id, computed, progress.version)
        .await
        .map_err(Error::store)?
      {
        SnapshotWrite::Applied { version } => {
          debug!(
            %user_id,
            %competency_id,
            required = required.len(),
            verified,
            coverage = computed.coverage_percentage,
            version,
            "coverage updated"
          );
          return Ok(CoverageReport::new(&progress, &required, verified, computed));
        }
        SnapshotWrite::Conflict { current } => {
          debug!(
            %user_id,
            %competency_id,
            read = progress.version,
            current,
            attempt,
            "snapshot changed during coverage; recomputing"
          );
        }
        SnapshotWrite::Missing => return Err(missing()),
      }
    }

    Err(Error::ConcurrentModification {
      user_id:       user_id.clone(),
      competency_id: competency_id.clone(),
      attempts:      MAX_SNAPSHOT_ATTEMPTS,
    })
  }
}
