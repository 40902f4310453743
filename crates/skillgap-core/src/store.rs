//! The `TaxonomyStore` and `ProfileStore` traits.
//!
//! Both are implemented by storage backends (e.g. `skillgap-store-sqlite`).
//! Every method is a point operation that the backend must make individually
//! atomic; the engine never composes them into a larger transaction. Writes
//! to a user-competency row are read-modify-write sequences guarded by the
//! version token on [`UserCompetency`](crate::progress::UserCompetency): a
//! snapshot write carries the coverage computed from that snapshot, and a
//! coverage-only write applies only if the snapshot it was computed from is
//! still current.

use std::future::Future;

use crate::{
  competency::Competency,
  id::{CompetencyId, SkillId, UserId},
  progress::{CompetencyScore, UserCompetency, VerifiedSkill},
  skill::Skill,
  user::{NewUser, User, UserSkill},
};

// ─── Snapshot writes ─────────────────────────────────────────────────────────

/// Outcome of a version-guarded write to a user-competency row:
/// [`ProfileStore::update_verified_skills`] or
/// [`ProfileStore::update_user_competency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotWrite {
  /// The write went through; `version` is the row's token afterwards.
  Applied { version: u64 },
  /// Another writer got there first; nothing was written.
  Conflict { current: u64 },
  /// The user-competency row does not exist (never created, or deleted).
  Missing,
}

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// Skill and competency records and the links between them.
pub trait TaxonomyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Skills ────────────────────────────────────────────────────────────

  fn get_skill_by_id<'a>(
    &'a self,
    id: &'a SkillId,
  ) -> impl Future<Output = Result<Option<Skill>, Self::Error>> + Send + 'a;

  /// Direct children of `parent`, in no particular order.
  fn get_child_skills<'a>(
    &'a self,
    parent: &'a SkillId,
  ) -> impl Future<Output = Result<Vec<Skill>, Self::Error>> + Send + 'a;

  /// All skills without a parent.
  fn list_root_skills(
    &self,
  ) -> impl Future<Output = Result<Vec<Skill>, Self::Error>> + Send + '_;

  /// Insert a skill. Returns `false` (and writes nothing) if the id is taken.
  fn add_skill<'a>(
    &'a self,
    skill: &'a Skill,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Re-parent `child` under `parent`, or make it a root with `None`.
  /// Returns `false` if `child` does not exist.
  fn link_parent_child_skill<'a>(
    &'a self,
    parent: Option<&'a SkillId>,
    child: &'a SkillId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete a skill. Descendants, competency links, user skills and snapshot
  /// entries naming it go with it. Returns `false` if it did not exist.
  fn delete_skill<'a>(
    &'a self,
    id: &'a SkillId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Competencies ──────────────────────────────────────────────────────

  fn get_competency_by_id<'a>(
    &'a self,
    id: &'a CompetencyId,
  ) -> impl Future<Output = Result<Option<Competency>, Self::Error>> + Send + 'a;

  /// Case-insensitive, whitespace-trimmed name match.
  fn get_competency_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Competency>, Self::Error>> + Send + 'a;

  fn get_child_competencies<'a>(
    &'a self,
    parent: &'a CompetencyId,
  ) -> impl Future<Output = Result<Vec<Competency>, Self::Error>> + Send + 'a;

  /// Insert a competency. Returns `false` (and writes nothing) if the id is
  /// taken.
  fn add_competency<'a>(
    &'a self,
    competency: &'a Competency,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Returns `false` if `id` does not exist.
  fn set_competency_parent<'a>(
    &'a self,
    id: &'a CompetencyId,
    parent: Option<&'a CompetencyId>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete a competency together with its child competencies, skill links
  /// and user-competency rows. Returns `false` if it did not exist.
  fn delete_competency<'a>(
    &'a self,
    id: &'a CompetencyId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Idempotent.
  fn link_skill_to_competency<'a>(
    &'a self,
    competency: &'a CompetencyId,
    skill: &'a SkillId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// L1 skills directly linked to `competency`.
  fn get_l1_skills_for_competency<'a>(
    &'a self,
    competency: &'a CompetencyId,
  ) -> impl Future<Output = Result<Vec<Skill>, Self::Error>> + Send + 'a;

  /// Competencies `skill` is directly linked to.
  fn get_competencies_for_skill<'a>(
    &'a self,
    skill: &'a SkillId,
  ) -> impl Future<Output = Result<Vec<Competency>, Self::Error>> + Send + 'a;
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Users, their skill verifications and their per-competency progress.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn get_user_by_id<'a>(
    &'a self,
    id: &'a UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Insert or update a user. An existing user keeps its relevance score and
  /// `created_at`.
  fn upsert_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn update_relevance_score<'a>(
    &'a self,
    id: &'a UserId,
    score: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── User skills ───────────────────────────────────────────────────────

  /// Insert or replace the (user, skill) verification record.
  fn upsert_user_skill(
    &self,
    record: UserSkill,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_user_skills<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<Vec<UserSkill>, Self::Error>> + Send + 'a;

  // ── User competencies ─────────────────────────────────────────────────

  fn get_user_competencies<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<Output = Result<Vec<UserCompetency>, Self::Error>> + Send + 'a;

  fn get_user_competency<'a>(
    &'a self,
    user: &'a UserId,
    competency: &'a CompetencyId,
  ) -> impl Future<Output = Result<Option<UserCompetency>, Self::Error>> + Send + 'a;

  /// Create an empty user-competency row if none exists, and return the
  /// current row either way.
  fn create_user_competency<'a>(
    &'a self,
    user: &'a UserId,
    competency: &'a CompetencyId,
  ) -> impl Future<Output = Result<UserCompetency, Self::Error>> + Send + 'a;

  /// Write derived coverage fields if and only if the row is still at
  /// `expected_version`, the version of the snapshot `score` was computed
  /// from. The version is not bumped.
  fn update_user_competency<'a>(
    &'a self,
    user: &'a UserId,
    competency: &'a CompetencyId,
    score: CompetencyScore,
    expected_version: u64,
  ) -> impl Future<Output = Result<SnapshotWrite, Self::Error>> + Send + 'a;

  /// Replace the verified-skill snapshot together with the coverage derived
  /// from it, if and only if the row is still at `expected_version`. The
  /// compare, both writes and the version bump are atomic.
  fn update_verified_skills<'a>(
    &'a self,
    user: &'a UserId,
    competency: &'a CompetencyId,
    skills: Vec<VerifiedSkill>,
    score: CompetencyScore,
    expected_version: u64,
  ) -> impl Future<Output = Result<SnapshotWrite, Self::Error>> + Send + 'a;
}
