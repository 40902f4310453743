//! In-memory store used by the engine tests.
//!
//! Implements both store traits over one mutex-guarded state, counts calls to
//! the methods tests assert on, and can be told to fail a named method, to
//! lose the next few snapshot writes to a simulated concurrent writer, or to
//! let another writer's snapshot land just before the next coverage write.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{
    Mutex,
    atomic::{AtomicU32, AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use thiserror::Error;

use crate::{
  competency::{Competency, normalize_name},
  id::{CompetencyId, SkillId, UserId},
  normalize::{DiscoveredCompetency, ExternalError, Normalizer},
  progress::{CompetencyScore, UserCompetency, VerifiedSkill},
  skill::Skill,
  store::{ProfileStore, SnapshotWrite, TaxonomyStore},
  user::{NewUser, User, UserSkill},
};

#[derive(Debug, Error)]
#[error("fake store failure in {0}")]
pub struct FakeError(&'static str);

#[derive(Default)]
struct State {
  skills:            BTreeMap<SkillId, Skill>,
  competencies:      BTreeMap<CompetencyId, Competency>,
  links:             BTreeSet<(CompetencyId, SkillId)>,
  users:             BTreeMap<UserId, User>,
  user_skills:       BTreeMap<(UserId, SkillId), UserSkill>,
  user_competencies: BTreeMap<(UserId, CompetencyId), UserCompetency>,
}

#[derive(Default)]
pub struct FakeStore {
  state:                      Mutex<State>,
  fail_on:                    Mutex<Option<&'static str>>,
  pending_conflicts:          AtomicU32,
  interleaved:                Mutex<Option<Vec<SkillId>>>,
  pub get_child_skills_calls: AtomicUsize,
  pub user_competency_reads:  AtomicUsize,
}

pub fn sid(raw: &str) -> SkillId { SkillId::parse(raw).unwrap() }
pub fn cid(raw: &str) -> CompetencyId { CompetencyId::parse(raw).unwrap() }
pub fn uid(raw: &str) -> UserId { UserId::parse(raw).unwrap() }

impl FakeStore {
  pub fn new() -> Self { Self::default() }

  // ─── Seeding ────────────────────────────────────────────────────────────

  pub fn skill(&self, id: &str, name: &str, parent: Option<&str>) -> &Self {
    let skill = Skill::new(sid(id), name, parent.map(sid)).unwrap();
    self.state.lock().unwrap().skills.insert(skill.skill_id.clone(), skill);
    self
  }

  /// Overwrite a skill's parent without any validation, for building
  /// malformed data.
  pub fn force_parent(&self, id: &str, parent: &str) -> &Self {
    let mut state = self.state.lock().unwrap();
    if let Some(skill) = state.skills.get_mut(&sid(id)) {
      skill.parent_skill_id = Some(sid(parent));
    }
    self
  }

  pub fn competency(&self, id: &str, name: &str, parent: Option<&str>) -> &Self {
    let competency = Competency::new(cid(id), name, parent.map(cid)).unwrap();
    self
      .state
      .lock()
      .unwrap()
      .competencies
      .insert(competency.competency_id.clone(), competency);
    self
  }

  pub fn link(&self, competency: &str, skill: &str) -> &Self {
    self
      .state
      .lock()
      .unwrap()
      .links
      .insert((cid(competency), sid(skill)));
    self
  }

  pub fn user(&self, id: &str, path_career: Option<&str>) -> &Self {
    let now = Utc::now();
    let user = User {
      user_id:         uid(id),
      user_name:       format!("User {id}"),
      company_id:      "acme".into(),
      employee_type:   None,
      path_career:     path_career.map(str::to_owned),
      raw_data:        None,
      relevance_score: 0.0,
      created_at:      now,
      updated_at:      now,
    };
    self.state.lock().unwrap().users.insert(user.user_id.clone(), user);
    self
  }

  /// A user-competency row whose snapshot marks `verified` as passed.
  pub fn progress(&self, user: &str, competency: &str, verified: &[&str]) -> &Self {
    let now = Utc::now();
    let row = UserCompetency {
      user_id:             uid(user),
      competency_id:       cid(competency),
      coverage_percentage: 0.0,
      proficiency_level:   None,
      verified_skills:     verified
        .iter()
        .map(|id| VerifiedSkill {
          skill_id:    sid(id),
          skill_name:  id.to_string(),
          verified:    true,
          last_update: now,
        })
        .collect(),
      version:             0,
    };
    self
      .state
      .lock()
      .unwrap()
      .user_competencies
      .insert((uid(user), cid(competency)), row);
    self
  }

  // ─── Inspection and failure injection ───────────────────────────────────

  pub fn fail_on(&self, method: &'static str) { *self.fail_on.lock().unwrap() = Some(method); }

  /// The next `n` snapshot writes find the version bumped by someone else.
  pub fn lose_snapshot_races(&self, n: u32) { self.pending_conflicts.store(n, Ordering::SeqCst); }

  /// Before the next coverage write, a concurrent writer marks `verified`
  /// as passed in that row's snapshot and bumps its version.
  pub fn interleave_snapshot_write(&self, verified: &[&str]) {
    *self.interleaved.lock().unwrap() = Some(verified.iter().map(|id| sid(id)).collect());
  }

  pub fn stored_user(&self, id: &str) -> User {
    self.state.lock().unwrap().users[&uid(id)].clone()
  }

  pub fn stored_progress(&self, user: &str, competency: &str) -> Option<UserCompetency> {
    self
      .state
      .lock()
      .unwrap()
      .user_competencies
      .get(&(uid(user), cid(competency)))
      .cloned()
  }

  pub fn stored_user_skill(&self, user: &str, skill: &str) -> Option<UserSkill> {
    self
      .state
      .lock()
      .unwrap()
      .user_skills
      .get(&(uid(user), sid(skill)))
      .cloned()
  }

  fn check(&self, method: &'static str) -> Result<(), FakeError> {
    match *self.fail_on.lock().unwrap() {
      Some(failing) if failing == method => Err(FakeError(method)),
      _ => Ok(()),
    }
  }
}

// ─── TaxonomyStore ───────────────────────────────────────────────────────────

impl TaxonomyStore for FakeStore {
  type Error = FakeError;

  async fn get_skill_by_id(&self, id: &SkillId) -> Result<Option<Skill>, FakeError> {
    self.check("get_skill_by_id")?;
    Ok(self.state.lock().unwrap().skills.get(id).cloned())
  }

  async fn get_child_skills(&self, parent: &SkillId) -> Result<Vec<Skill>, FakeError> {
    self.check("get_child_skills")?;
    self.get_child_skills_calls.fetch_add(1, Ordering::SeqCst);
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .skills
        .values()
        .filter(|s| s.parent_skill_id.as_ref() == Some(parent))
        .cloned()
        .collect(),
    )
  }

  async fn list_root_skills(&self) -> Result<Vec<Skill>, FakeError> {
    self.check("list_root_skills")?;
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .skills
        .values()
        .filter(|s| s.is_l1())
        .cloned()
        .collect(),
    )
  }

  async fn add_skill(&self, skill: &Skill) -> Result<bool, FakeError> {
    self.check("add_skill")?;
    let mut state = self.state.lock().unwrap();
    if state.skills.contains_key(&skill.skill_id) {
      return Ok(false);
    }
    state.skills.insert(skill.skill_id.clone(), skill.clone());
    Ok(true)
  }

  async fn link_parent_child_skill(
    &self,
    parent: Option<&SkillId>,
    child: &SkillId,
  ) -> Result<bool, FakeError> {
    self.check("link_parent_child_skill")?;
    let mut state = self.state.lock().unwrap();
    match state.skills.get_mut(child) {
      Some(skill) => {
        skill.parent_skill_id = parent.cloned();
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn delete_skill(&self, id: &SkillId) -> Result<bool, FakeError> {
    self.check("delete_skill")?;
    let mut state = self.state.lock().unwrap();
    if !state.skills.contains_key(id) {
      return Ok(false);
    }

    let mut doomed = BTreeSet::from([id.clone()]);
    let mut frontier = vec![id.clone()];
    while let Some(current) = frontier.pop() {
      for skill in state.skills.values() {
        if skill.parent_skill_id.as_ref() == Some(&current)
          && doomed.insert(skill.skill_id.clone())
        {
          frontier.push(skill.skill_id.clone());
        }
      }
    }

    state.skills.retain(|id, _| !doomed.contains(id));
    state.links.retain(|(_, s)| !doomed.contains(s));
    state.user_skills.retain(|(_, s), _| !doomed.contains(s));
    for row in state.user_competencies.values_mut() {
      row.verified_skills.retain(|vs| !doomed.contains(&vs.skill_id));
    }
    Ok(true)
  }

  async fn get_competency_by_id(
    &self,
    id: &CompetencyId,
  ) -> Result<Option<Competency>, FakeError> {
    self.check("get_competency_by_id")?;
    Ok(self.state.lock().unwrap().competencies.get(id).cloned())
  }

  async fn get_competency_by_name(
    &self,
    name: &str,
  ) -> Result<Option<Competency>, FakeError> {
    self.check("get_competency_by_name")?;
    let wanted = normalize_name(name);
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .competencies
        .values()
        .find(|c| normalize_name(&c.competency_name) == wanted)
        .cloned(),
    )
  }

  async fn get_child_competencies(
    &self,
    parent: &CompetencyId,
  ) -> Result<Vec<Competency>, FakeError> {
    self.check("get_child_competencies")?;
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .competencies
        .values()
        .filter(|c| c.parent_competency_id.as_ref() == Some(parent))
        .cloned()
        .collect(),
    )
  }

  async fn add_competency(&self, competency: &Competency) -> Result<bool, FakeError> {
    self.check("add_competency")?;
    let mut state = self.state.lock().unwrap();
    if state.competencies.contains_key(&competency.competency_id) {
      return Ok(false);
    }
    state
      .competencies
      .insert(competency.competency_id.clone(), competency.clone());
    Ok(true)
  }

  async fn set_competency_parent(
    &self,
    id: &CompetencyId,
    parent: Option<&CompetencyId>,
  ) -> Result<bool, FakeError> {
    self.check("set_competency_parent")?;
    let mut state = self.state.lock().unwrap();
    match state.competencies.get_mut(id) {
      Some(competency) => {
        competency.parent_competency_id = parent.cloned();
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn delete_competency(&self, id: &CompetencyId) -> Result<bool, FakeError> {
    self.check("delete_competency")?;
    let mut state = self.state.lock().unwrap();
    if !state.competencies.contains_key(id) {
      return Ok(false);
    }

    let doomed: BTreeSet<CompetencyId> = state
      .competencies
      .values()
      .filter(|c| c.parent_competency_id.as_ref() == Some(id))
      .map(|c| c.competency_id.clone())
      .chain([id.clone()])
      .collect();

    state.competencies.retain(|id, _| !doomed.contains(id));
    state.links.retain(|(c, _)| !doomed.contains(c));
    state.user_competencies.retain(|(_, c), _| !doomed.contains(c));
    Ok(true)
  }

  async fn link_skill_to_competency(
    &self,
    competency: &CompetencyId,
    skill: &SkillId,
  ) -> Result<(), FakeError> {
    self.check("link_skill_to_competency")?;
    self
      .state
      .lock()
      .unwrap()
      .links
      .insert((competency.clone(), skill.clone()));
    Ok(())
  }

  async fn get_l1_skills_for_competency(
    &self,
    competency: &CompetencyId,
  ) -> Result<Vec<Skill>, FakeError> {
    self.check("get_l1_skills_for_competency")?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .links
        .iter()
        .filter(|(c, _)| c == competency)
        .filter_map(|(_, s)| state.skills.get(s))
        .filter(|s| s.is_l1())
        .cloned()
        .collect(),
    )
  }

  async fn get_competencies_for_skill(
    &self,
    skill: &SkillId,
  ) -> Result<Vec<Competency>, FakeError> {
    self.check("get_competencies_for_skill")?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .links
        .iter()
        .filter(|(_, s)| s == skill)
        .filter_map(|(c, _)| state.competencies.get(c))
        .cloned()
        .collect(),
    )
  }
}

// ─── ProfileStore ────────────────────────────────────────────────────────────

impl ProfileStore for FakeStore {
  type Error = FakeError;

  async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, FakeError> {
    self.check("get_user_by_id")?;
    Ok(self.state.lock().unwrap().users.get(id).cloned())
  }

  async fn upsert_user(&self, user: NewUser) -> Result<User, FakeError> {
    self.check("upsert_user")?;
    let now = Utc::now();
    let mut state = self.state.lock().unwrap();
    let (relevance_score, created_at) = state
      .users
      .get(&user.user_id)
      .map_or((0.0, now), |u| (u.relevance_score, u.created_at));
    let stored = User {
      user_id: user.user_id,
      user_name: user.user_name,
      company_id: user.company_id,
      employee_type: user.employee_type,
      path_career: user.path_career,
      raw_data: user.raw_data,
      relevance_score,
      created_at,
      updated_at: now,
    };
    state.users.insert(stored.user_id.clone(), stored.clone());
    Ok(stored)
  }

  async fn update_relevance_score(&self, id: &UserId, score: f64) -> Result<(), FakeError> {
    self.check("update_relevance_score")?;
    if let Some(user) = self.state.lock().unwrap().users.get_mut(id) {
      user.relevance_score = score;
    }
    Ok(())
  }

  async fn upsert_user_skill(&self, record: UserSkill) -> Result<(), FakeError> {
    self.check("upsert_user_skill")?;
    self
      .state
      .lock()
      .unwrap()
      .user_skills
      .insert((record.user_id.clone(), record.skill_id.clone()), record);
    Ok(())
  }

  async fn get_user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, FakeError> {
    self.check("get_user_skills")?;
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .user_skills
        .values()
        .filter(|us| &us.user_id == user)
        .cloned()
        .collect(),
    )
  }

  async fn get_user_competencies(
    &self,
    user: &UserId,
  ) -> Result<Vec<UserCompetency>, FakeError> {
    self.check("get_user_competencies")?;
    self.user_competency_reads.fetch_add(1, Ordering::SeqCst);
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .user_competencies
        .values()
        .filter(|uc| &uc.user_id == user)
        .cloned()
        .collect(),
    )
  }

  async fn get_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
  ) -> Result<Option<UserCompetency>, FakeError> {
    self.check("get_user_competency")?;
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .user_competencies
        .get(&(user.clone(), competency.clone()))
        .cloned(),
    )
  }

  async fn create_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
  ) -> Result<UserCompetency, FakeError> {
    self.check("create_user_competency")?;
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .user_competencies
        .entry((user.clone(), competency.clone()))
        .or_insert_with(|| UserCompetency {
          user_id:             user.clone(),
          competency_id:       competency.clone(),
          coverage_percentage: 0.0,
          proficiency_level:   None,
          verified_skills:     Vec::new(),
          version:             0,
        })
        .clone(),
    )
  }

  async fn update_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
    score: CompetencyScore,
    expected_version: u64,
  ) -> Result<SnapshotWrite, FakeError> {
    self.check("update_user_competency")?;
    let interleaved = self.interleaved.lock().unwrap().take();
    let mut state = self.state.lock().unwrap();
    let Some(row) = state
      .user_competencies
      .get_mut(&(user.clone(), competency.clone()))
    else {
      return Ok(SnapshotWrite::Missing);
    };

    if let Some(verified) = interleaved {
      for skill_id in verified {
        row.merge_entry(VerifiedSkill {
          skill_name:  skill_id.to_string(),
          skill_id,
          verified:    true,
          last_update: Utc::now(),
        });
      }
      row.version += 1;
    }

    if row.version != expected_version {
      return Ok(SnapshotWrite::Conflict { current: row.version });
    }
    row.coverage_percentage = score.coverage_percentage;
    row.proficiency_level = Some(score.proficiency_level);
    Ok(SnapshotWrite::Applied { version: row.version })
  }

  async fn update_verified_skills(
    &self,
    user: &UserId,
    competency: &CompetencyId,
    skills: Vec<VerifiedSkill>,
    score: CompetencyScore,
    expected_version: u64,
  ) -> Result<SnapshotWrite, FakeError> {
    self.check("update_verified_skills")?;
    let mut state = self.state.lock().unwrap();
    let Some(row) = state
      .user_competencies
      .get_mut(&(user.clone(), competency.clone()))
    else {
      return Ok(SnapshotWrite::Missing);
    };

    let lost_race = self
      .pending_conflicts
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if lost_race {
      row.version += 1;
    }

    if row.version != expected_version {
      return Ok(SnapshotWrite::Conflict { current: row.version });
    }
    row.verified_skills = skills;
    row.coverage_percentage = score.coverage_percentage;
    row.proficiency_level = Some(score.proficiency_level);
    row.version += 1;
    Ok(SnapshotWrite::Applied { version: row.version })
  }
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Scripted normalizer: a fixed alias table, an optional discovery answer,
/// and a fixed extraction result.
#[derive(Default)]
pub struct FakeNormalizer {
  pub aliases:    BTreeMap<String, String>,
  pub discovered: Option<DiscoveredCompetency>,
  pub extracted:  Option<Vec<String>>,
  pub broken:     bool,
}

impl FakeNormalizer {
  fn unavailable(&self) -> Result<(), ExternalError> {
    if self.broken {
      return Err(ExternalError::new("fake-normalizer", "unavailable"));
    }
    Ok(())
  }
}

impl Normalizer for FakeNormalizer {
  async fn normalize_competency_name(&self, name: &str) -> Result<String, ExternalError> {
    self.unavailable()?;
    Ok(
      self
        .aliases
        .get(&normalize_name(name))
        .cloned()
        .unwrap_or_else(|| name.trim().to_owned()),
    )
  }

  async fn discover_competency(
    &self,
    _name: &str,
  ) -> Result<Option<DiscoveredCompetency>, ExternalError> {
    self.unavailable()?;
    Ok(self.discovered.clone())
  }

  async fn extract_competencies(&self, _raw: &str) -> Result<Vec<String>, ExternalError> {
    self.unavailable()?;
    self
      .extracted
      .clone()
      .ok_or_else(|| ExternalError::new("fake-normalizer", "nothing scripted"))
  }
}
