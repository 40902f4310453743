//! Error types for `skillgap-core`.

use thiserror::Error;

use crate::id::{CompetencyId, SkillId, UserId};

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  User,
  Skill,
  Competency,
  UserCompetency,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: String },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error(
    "competency {0} is already a child competency; maximum hierarchy depth (2 layers) exceeded"
  )]
  HierarchyDepth(CompetencyId),

  #[error("skill {0} is not an L1 skill; only L1 skills can be linked to competencies")]
  NotL1Skill(SkillId),

  #[error("placing skill {skill} under {parent} would create a circular reference")]
  CyclicHierarchy { skill: SkillId, parent: SkillId },

  #[error("hierarchy traversal exceeded the limit of {limit} nodes")]
  HierarchyTooLarge { limit: usize },

  #[error(
    "verified skills for user {user_id} / competency {competency_id} changed concurrently \
     {attempts} times in a row"
  )]
  ConcurrentModification {
    user_id:       UserId,
    competency_id: CompetencyId,
    attempts:      u32,
  },

  #[error("external service {service} failed: {message}")]
  ExternalApi { service: String, message: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
    Self::NotFound { kind, id: id.to_string() }
  }

  /// Wrap a backend error. Used as `.map_err(Error::store)` on every store
  /// call so failures abort the computation instead of being swallowed.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
