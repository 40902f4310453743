//! Per-competency progress: the verified-skill snapshot and derived scores.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{CompetencyId, SkillId, UserId};

/// Categorical label derived from coverage percentage.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProficiencyLevel {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

/// One entry of a user's verified-skill snapshot for a competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedSkill {
  pub skill_id:    SkillId,
  pub skill_name:  String,
  pub verified:    bool,
  pub last_update: DateTime<Utc>,
}

/// A user's standing in one competency.
///
/// `verified_skills` is a denormalised cache of [`UserSkill`](crate::user::UserSkill)
/// rows, but it is the value the coverage and gap engine reads. Writes to it
/// go through [`ProfileStore::update_verified_skills`](crate::store::ProfileStore::update_verified_skills)
/// and must carry the `version` they were computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCompetency {
  pub user_id:             UserId,
  pub competency_id:       CompetencyId,
  pub coverage_percentage: f64,
  /// Absent until coverage has been computed at least once.
  pub proficiency_level:   Option<ProficiencyLevel>,
  pub verified_skills:     Vec<VerifiedSkill>,
  /// Optimistic-concurrency token, bumped on every snapshot write.
  pub version:             u64,
}

impl UserCompetency {
  /// Ids of snapshot entries whose `verified` flag is set.
  pub fn verified_ids(&self) -> HashSet<&SkillId> {
    self
      .verified_skills
      .iter()
      .filter(|vs| vs.verified)
      .map(|vs| &vs.skill_id)
      .collect()
  }

  /// Replace the entry for `entry.skill_id`, or append it.
  pub fn merge_entry(&mut self, entry: VerifiedSkill) {
    match self
      .verified_skills
      .iter_mut()
      .find(|vs| vs.skill_id == entry.skill_id)
    {
      Some(existing) => *existing = entry,
      None => self.verified_skills.push(entry),
    }
  }
}

/// The derived fields written back by the coverage calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetencyScore {
  pub coverage_percentage: f64,
  pub proficiency_level:   ProficiencyLevel,
}
