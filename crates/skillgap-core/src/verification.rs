//! Applying assessment results to a user's record.
//!
//! Each skill result becomes a snapshot entry in every competency the skill
//! counts towards, then a [`UserSkill`] upsert. Snapshot entries are merged
//! read-modify-write under the row's version token, so two assessments for
//! the same user landing at once cannot drop each other's entries. Every
//! snapshot write carries the coverage recomputed from the merged snapshot,
//! so a failure partway through leaves each row's coverage matching its
//! snapshot, and replaying the assessment converges.

use std::collections::{BTreeMap, HashSet, btree_map::Entry};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  EntityKind, Error, Result,
  assessment::{AssessmentResult, ExamStatus, ExamType, SkillStatus},
  competency::Competency,
  coverage::{CoverageReport, score},
  hierarchy::{HierarchyResolver, MgsSet, TraversalLimits},
  id::{CompetencyId, SkillId, UserId},
  progress::VerifiedSkill,
  relevance::RelevanceScorer,
  skill::Skill,
  store::{ProfileStore, SnapshotWrite, TaxonomyStore},
  user::{SkillSource, UserSkill},
};

/// Attempts at a snapshot merge before giving up with
/// [`Error::ConcurrentModification`].
pub const MAX_SNAPSHOT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
  pub user_id:               UserId,
  pub exam_type:             ExamType,
  pub exam_status:           ExamStatus,
  pub course_name:           Option<String>,
  pub updated_competencies:  Vec<CoverageReport>,
  /// Results applied with a PASS status.
  pub verified_skills_count: usize,
  /// Result ids that name no known skill. These are skipped.
  pub unknown_skills:        Vec<SkillId>,
  pub relevance_score:       f64,
}

pub struct VerificationService<'a, T, P> {
  taxonomy: &'a T,
  profiles: &'a P,
  limits:   TraversalLimits,
}

impl<'a, T, P> VerificationService<'a, T, P>
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

  pub async fn record_assessment(
    &self,
    user_id: &UserId,
    assessment: AssessmentResult,
  ) -> Result<VerificationOutcome> {
    if self
      .profiles
      .get_user_by_id(user_id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::not_found(EntityKind::User, user_id));
    }

    let AssessmentResult { exam_type, exam_status, course_name, skills } = assessment;
    debug!(
      %user_id,
      ?exam_type,
      ?exam_status,
      course = course_name.as_deref().unwrap_or(""),
      results = skills.len(),
      "recording assessment"
    );

    let now = Utc::now();
    let resolver = HierarchyResolver::new(self.taxonomy).with_limits(self.limits);
    // Required MGS per competency, resolved once per assessment.
    let mut required_by: BTreeMap<CompetencyId, MgsSet> = BTreeMap::new();
    let mut reports: BTreeMap<CompetencyId, CoverageReport> = BTreeMap::new();
    let mut unknown_skills = Vec::new();
    let mut verified_skills_count = 0;

    for result in skills {
      let Some(skill) = self
        .taxonomy
        .get_skill_by_id(&result.skill_id)
        .await
        .map_err(Error::store)?
      else {
        warn!(%user_id, skill_id = %result.skill_id, "assessment names unknown skill");
        unknown_skills.push(result.skill_id);
        continue;
      };

      let verified = result.status == SkillStatus::Pass;
      if verified {
        verified_skills_count += 1;
      }
      let skill_name = if result.skill_name.trim().is_empty() {
        skill.skill_name.clone()
      } else {
        result.skill_name
      };
      let skill_id = skill.skill_id.clone();

      let entry = VerifiedSkill {
        skill_id: skill_id.clone(),
        skill_name: skill_name.clone(),
        verified,
        last_update: now,
      };
      for competency_id in self.competencies_counting(skill).await? {
        let required = match required_by.entry(competency_id.clone()) {
          Entry::Occupied(cached) => cached.into_mut(),
          Entry::Vacant(slot) => {
            slot.insert(resolver.resolve_mgs_for_competency(&competency_id).await?)
          }
        };
        let report = self
          .merge_snapshot(user_id, &competency_id, &entry, required)
          .await?;
        reports.insert(competency_id, report);
      }

      self
        .profiles
        .upsert_user_skill(UserSkill {
          user_id: user_id.clone(),
          skill_id,
          skill_name,
          verified,
          source: SkillSource::Assessment,
          last_update: now,
        })
        .await
        .map_err(Error::store)?;
    }

    let relevance_score = RelevanceScorer::new(self.taxonomy, self.profiles)
      .with_limits(self.limits)
      .calculate_relevance_score(user_id)
      .await?;

    let updated_competencies: Vec<CoverageReport> = reports.into_values().collect();
    info!(
      %user_id,
      ?exam_type,
      ?exam_status,
      competencies = updated_competencies.len(),
      verified = verified_skills_count,
      unknown = unknown_skills.len(),
      "assessment recorded"
    );

    Ok(VerificationOutcome {
      user_id: user_id.clone(),
      exam_type,
      exam_status,
      course_name,
      updated_competencies,
      verified_skills_count,
      unknown_skills,
      relevance_score,
    })
  }

  /// The competencies a skill's verification counts towards: those linked to
  /// its L1 root, plus their parents.
  async fn competencies_counting(&self, skill: Skill) -> Result<Vec<CompetencyId>> {
    let root = self.l1_root(skill).await?;
    let linked = self
      .taxonomy
      .get_competencies_for_skill(&root.skill_id)
      .await
      .map_err(Error::store)?;

    let mut found: BTreeMap<CompetencyId, Competency> = BTreeMap::new();
    for competency in linked {
      let parent_id = competency
        .parent_competency_id
        .clone()
        .filter(|id| !found.contains_key(id));
      found.insert(competency.competency_id.clone(), competency);

      let Some(parent_id) = parent_id else { continue };
      match self
        .taxonomy
        .get_competency_by_id(&parent_id)
        .await
        .map_err(Error::store)?
      {
        Some(parent) => {
          found.insert(parent.competency_id.clone(), parent);
        }
        None => warn!(competency_id = %parent_id, "parent competency is missing"),
      }
    }
    Ok(found.into_keys().collect())
  }

  /// Walk parent links up to the root. A dangling parent or a cycle stops the
  /// walk at the last skill reached.
  async fn l1_root(&self, skill: Skill) -> Result<Skill> {
    let mut seen: HashSet<SkillId> = HashSet::new();
    let mut current = skill;

    loop {
      seen.insert(current.skill_id.clone());
      let Some(parent_id) = current.parent_skill_id.clone() else {
        return Ok(current);
      };
      if seen.contains(&parent_id) {
        warn!(skill_id = %current.skill_id, "cycle in skill parents");
        return Ok(current);
      }
      match self
        .taxonomy
        .get_skill_by_id(&parent_id)
        .await
        .map_err(Error::store)?
      {
        Some(parent) => current = parent,
        None => {
          warn!(skill_id = %current.skill_id, %parent_id, "dangling parent skill");
          return Ok(current);
        }
      }
    }
  }

  /// Merge `entry` into the (user, competency) snapshot and write the
  /// coverage of `required` by the merged snapshot with it, retrying on
  /// version conflicts.
  async fn merge_snapshot(
    &self,
    user_id: &UserId,
    competency_id: &CompetencyId,
    entry: &VerifiedSkill,
    required: &MgsSet,
  ) -> Result<CoverageReport> {
    for attempt in 1..=MAX_SNAPSHOT_ATTEMPTS {
      let mut progress = self
        .profiles
        .create_user_competency(user_id, competency_id)
        .await
        .map_err(Error::store)?;
      let expected = progress.version;
      progress.merge_entry(entry.clone());
      let (verified, computed) = score(required, &progress);
      let report = CoverageReport::new(&progress, required, verified, computed);

      match self
        .profiles
        .update_verified_skills(
          user_id,
          competency_id,
          progress.verified_skills,
          computed,
          expected,
        )
        .await
        .map_err(Error::store)?
      {
        SnapshotWrite::Applied { version } => {
          debug!(
            %user_id,
            %competency_id,
            version,
            attempt,
            coverage = computed.coverage_percentage,
            "snapshot merged"
          );
          return Ok(report);
        }
        SnapshotWrite::Conflict { current } => {
          debug!(
            %user_id,
            %competency_id,
            expected,
            current,
            attempt,
            "snapshot version conflict; retrying"
          );
        }
        SnapshotWrite::Missing => {
          debug!(%user_id, %competency_id, attempt, "snapshot row vanished; retrying");
        }
      }
    }

    Err(Error::ConcurrentModification {
      user_id:       user_id.clone(),
      competency_id: competency_id.clone(),
      attempts:      MAX_SNAPSHOT_ATTEMPTS,
    })
  }
}
