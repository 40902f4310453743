//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, enumerations by their wire
//! names, booleans as 0/1 integers, and the version token as an INTEGER.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use skillgap_core::{
  CompetencyId, SkillId, UserId,
  competency::Competency,
  progress::{ProficiencyLevel, UserCompetency, VerifiedSkill},
  skill::Skill,
  user::{SkillSource, User, UserSkill},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn encode_source(source: SkillSource) -> String { source.to_string() }

pub fn decode_source(s: &str) -> Result<SkillSource> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown skill source: {s:?}")))
}

pub fn encode_level(level: ProficiencyLevel) -> String { level.to_string() }

pub fn decode_level(s: &str) -> Result<ProficiencyLevel> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown proficiency level: {s:?}")))
}

// ─── Version token ───────────────────────────────────────────────────────────

pub fn encode_version(version: u64) -> Result<i64> {
  i64::try_from(version)
    .map_err(|_| Error::Decode(format!("version {version} out of range")))
}

pub fn decode_version(raw: i64) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::Decode(format!("negative version {raw}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub struct RawSkill {
  pub skill_id:        String,
  pub skill_name:      String,
  pub parent_skill_id: Option<String>,
  pub description:     Option<String>,
}

impl RawSkill {
  /// Expects `skill_id, skill_name, parent_skill_id, description`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      skill_id:        row.get(0)?,
      skill_name:      row.get(1)?,
      parent_skill_id: row.get(2)?,
      description:     row.get(3)?,
    })
  }

  pub fn into_skill(self) -> Result<Skill> {
    Ok(Skill {
      skill_id:        SkillId::parse(self.skill_id)?,
      skill_name:      self.skill_name,
      parent_skill_id: self.parent_skill_id.map(SkillId::parse).transpose()?,
      description:     self.description,
    })
  }
}

pub struct RawCompetency {
  pub competency_id:        String,
  pub competency_name:      String,
  pub description:          Option<String>,
  pub parent_competency_id: Option<String>,
}

impl RawCompetency {
  /// Expects `competency_id, competency_name, description,
  /// parent_competency_id`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      competency_id:        row.get(0)?,
      competency_name:      row.get(1)?,
      description:          row.get(2)?,
      parent_competency_id: row.get(3)?,
    })
  }

  pub fn into_competency(self) -> Result<Competency> {
    Ok(Competency {
      competency_id:        CompetencyId::parse(self.competency_id)?,
      competency_name:      self.competency_name,
      description:          self.description,
      parent_competency_id: self
        .parent_competency_id
        .map(CompetencyId::parse)
        .transpose()?,
    })
  }
}

pub const USER_COLUMNS: &str = "user_id, user_name, company_id, employee_type, \
                                path_career, raw_data, relevance_score, \
                                created_at, updated_at";

pub struct RawUser {
  pub user_id:         String,
  pub user_name:       String,
  pub company_id:      String,
  pub employee_type:   Option<String>,
  pub path_career:     Option<String>,
  pub raw_data:        Option<String>,
  pub relevance_score: f64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawUser {
  /// Reads the columns of [`USER_COLUMNS`], in order.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:         row.get(0)?,
      user_name:       row.get(1)?,
      company_id:      row.get(2)?,
      employee_type:   row.get(3)?,
      path_career:     row.get(4)?,
      raw_data:        row.get(5)?,
      relevance_score: row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:         UserId::parse(self.user_id)?,
      user_name:       self.user_name,
      company_id:      self.company_id,
      employee_type:   self.employee_type,
      path_career:     self.path_career,
      raw_data:        self.raw_data,
      relevance_score: self.relevance_score,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawUserSkill {
  pub user_id:     String,
  pub skill_id:    String,
  pub skill_name:  String,
  pub verified:    bool,
  pub source:      String,
  pub last_update: String,
}

impl RawUserSkill {
  pub fn into_user_skill(self) -> Result<UserSkill> {
    Ok(UserSkill {
      user_id:     UserId::parse(self.user_id)?,
      skill_id:    SkillId::parse(self.skill_id)?,
      skill_name:  self.skill_name,
      verified:    self.verified,
      source:      decode_source(&self.source)?,
      last_update: decode_dt(&self.last_update)?,
    })
  }
}

pub struct RawVerifiedSkill {
  pub skill_id:    String,
  pub skill_name:  String,
  pub verified:    bool,
  pub last_update: String,
}

impl RawVerifiedSkill {
  fn into_verified_skill(self) -> Result<VerifiedSkill> {
    Ok(VerifiedSkill {
      skill_id:    SkillId::parse(self.skill_id)?,
      skill_name:  self.skill_name,
      verified:    self.verified,
      last_update: decode_dt(&self.last_update)?,
    })
  }
}

/// A `user_competencies` row together with its snapshot rows.
pub struct RawUserCompetency {
  pub user_id:             String,
  pub competency_id:       String,
  pub coverage_percentage: f64,
  pub proficiency_level:   Option<String>,
  pub version:             i64,
  pub verified_skills:     Vec<RawVerifiedSkill>,
}

impl RawUserCompetency {
  pub fn into_user_competency(self) -> Result<UserCompetency> {
    Ok(UserCompetency {
      user_id:             UserId::parse(self.user_id)?,
      competency_id:       CompetencyId::parse(self.competency_id)?,
      coverage_percentage: self.coverage_percentage,
      proficiency_level:   self
        .proficiency_level
        .as_deref()
        .map(decode_level)
        .transpose()?,
      verified_skills:     self
        .verified_skills
        .into_iter()
        .map(RawVerifiedSkill::into_verified_skill)
        .collect::<Result<_>>()?,
      version:             decode_version(self.version)?,
    })
  }
}
