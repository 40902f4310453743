//! Missing-skill analysis: required MGS minus verified skills.
//!
//! Two scopes:
//!
//! | scope  | competencies considered                         | `exam_type`   |
//! |--------|-------------------------------------------------|---------------|
//! | narrow | the one named competency or course              | `post_course` |
//! | broad  | every competency the user holds, given a career | `baseline`    |
//! |        | path goal                                       |               |

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  EntityKind, Error, Result,
  assessment::{ExamStatus, ExamType},
  hierarchy::{HierarchyResolver, MgsSet, TraversalLimits},
  id::{CompetencyId, SkillId, UserId},
  normalize::Normalizer,
  store::{ProfileStore, TaxonomyStore},
  taxonomy::TaxonomyService,
  user::User,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSkill {
  pub skill_id:   SkillId,
  pub skill_name: String,
}

/// The missing MGS of one competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSkillGroup {
  pub competency_id:   CompetencyId,
  pub competency_name: String,
  pub missing_mgs:     Vec<MissingSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapResult {
  pub user_id:            UserId,
  pub user_name:          String,
  pub exam_status:        ExamStatus,
  pub exam_type:          Option<ExamType>,
  pub course_name:        Option<String>,
  pub company:            String,
  pub career_path_goal:   Option<String>,
  pub missing_skills_map: BTreeMap<CompetencyId, MissingSkillGroup>,
}

impl GapResult {
  fn for_user(user: &User, exam_status: ExamStatus, exam_type: ExamType) -> Self {
    Self {
      user_id: user.user_id.clone(),
      user_name: user.user_name.clone(),
      exam_status,
      exam_type: Some(exam_type),
      course_name: None,
      company: user.company_id.clone(),
      career_path_goal: user.career_path_goal().map(str::to_owned),
      missing_skills_map: BTreeMap::new(),
    }
  }
}

/// Members of `required` not present in `verified`, in id order.
pub fn missing_skills(
  required: &MgsSet,
  verified: &HashSet<&SkillId>,
) -> Vec<MissingSkill> {
  required
    .iter()
    .filter(|skill| !verified.contains(&skill.skill_id))
    .map(|skill| MissingSkill {
      skill_id:   skill.skill_id.clone(),
      skill_name: skill.skill_name.clone(),
    })
    .collect()
}

pub struct GapAnalyzer<'a, T, P, N> {
  taxonomy:   &'a T,
  profiles:   &'a P,
  normalizer: &'a N,
  limits:     TraversalLimits,
}

impl<'a, T, P, N> GapAnalyzer<'a, T, P, N>
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

  async fn user(&self, id: &UserId) -> Result<User> {
    self
      .profiles
      .get_user_by_id(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::User, id))
  }

  // ─── Narrow ─────────────────────────────────────────────────────────────

  /// Missing skills for one competency, named by `course`.
  ///
  /// The result always carries exactly one group, which may be empty. A user
  /// with no progress record for the competency has nothing verified.
  pub async fn narrow(
    &self,
    user_id: &UserId,
    course: &str,
    exam_status: ExamStatus,
  ) -> Result<GapResult> {
    let user = self.user(user_id).await?;

    let competency = TaxonomyService::new(self.taxonomy, self.normalizer)
      .with_limits(self.limits)
      .find_competency(course)
      .await?
      .ok_or_else(|| Error::not_found(EntityKind::Competency, course.trim()))?;

    let required = HierarchyResolver::new(self.taxonomy)
      .with_limits(self.limits)
      .resolve_mgs_for_competency(&competency.competency_id)
      .await?;

    let progress = self
      .profiles
      .get_user_competency(user_id, &competency.competency_id)
      .await
      .map_err(Error::store)?;
    let missing_mgs = match &progress {
      Some(progress) => missing_skills(&required, &progress.verified_ids()),
      None => missing_skills(&required, &HashSet::new()),
    };

    debug!(
      %user_id,
      competency_id = %competency.competency_id,
      required = required.len(),
      missing = missing_mgs.len(),
      "narrow gap analysis"
    );

    let mut result = GapResult::for_user(&user, exam_status, ExamType::PostCourse);
    result.course_name = Some(course.to_owned());
    result.missing_skills_map.insert(
      competency.competency_id.clone(),
      MissingSkillGroup {
        competency_id: competency.competency_id,
        competency_name: competency.competency_name,
        missing_mgs,
      },
    );
    Ok(result)
  }

  // ─── Broad ──────────────────────────────────────────────────────────────

  /// Missing skills across every competency the user holds.
  ///
  /// A user without a career-path goal gets an empty map, and no competency
  /// is read. Competencies with nothing missing are left out.
  pub async fn broad(
    &self,
    user_id: &UserId,
    exam_status: ExamStatus,
  ) -> Result<GapResult> {
    let user = self.user(user_id).await?;
    let mut result = GapResult::for_user(&user, exam_status, ExamType::Baseline);

    if result.career_path_goal.is_none() {
      debug!(%user_id, "no career path goal; skipping broad analysis");
      return Ok(result);
    }

    let held = self
      .profiles
      .get_user_competencies(user_id)
      .await
      .map_err(Error::store)?;
    let resolver = HierarchyResolver::new(self.taxonomy).with_limits(self.limits);

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

      let required = resolver
        .resolve_mgs_for_competency(&competency.competency_id)
        .await?;
      let missing_mgs = missing_skills(&required, &progress.verified_ids());
      if missing_mgs.is_empty() {
        continue;
      }

      result.missing_skills_map.insert(
        competency.competency_id.clone(),
        MissingSkillGroup {
          competency_id: competency.competency_id,
          competency_name: competency.competency_name,
          missing_mgs,
        },
      );
    }

    debug!(
      %user_id,
      groups = result.missing_skills_map.len(),
      "broad gap analysis"
    );
    Ok(result)
  }
}
