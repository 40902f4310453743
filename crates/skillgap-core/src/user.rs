//! Users and their per-skill verification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{SkillId, UserId};

/// A learner or employee whose progress is tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:         UserId,
  pub user_name:       String,
  pub company_id:      String,
  pub employee_type:   Option<String>,
  /// The career-path goal. Broad gap analysis and relevance scoring are
  /// no-ops without one.
  pub path_career:     Option<String>,
  pub raw_data:        Option<String>,
  /// Aggregate verified/required MGS ratio, 0–100.
  pub relevance_score: f64,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl User {
  /// The career-path goal, treating blank strings as absent.
  pub fn career_path_goal(&self) -> Option<&str> {
    self
      .path_career
      .as_deref()
      .map(str::trim)
      .filter(|p| !p.is_empty())
  }
}

/// Input to [`ProfileStore::upsert_user`](crate::store::ProfileStore::upsert_user).
/// Timestamps and the relevance score are owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub user_id:       UserId,
  pub user_name:     String,
  pub company_id:    String,
  pub employee_type: Option<String>,
  pub path_career:   Option<String>,
  pub raw_data:      Option<String>,
}

/// Where a skill verification came from.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SkillSource {
  #[default]
  Assessment,
  Certification,
  Claim,
  Ai,
}

/// The authoritative verification record for one (user, skill) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSkill {
  pub user_id:     UserId,
  pub skill_id:    SkillId,
  pub skill_name:  String,
  pub verified:    bool,
  pub source:      SkillSource,
  pub last_update: DateTime<Utc>,
}
