//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use skillgap_core::{
  CompetencyId, SkillId, UserId,
  assessment::ExamStatus,
  competency::Competency,
  coverage::CoverageCalculator,
  gap::GapAnalyzer,
  normalize::Passthrough,
  progress::{CompetencyScore, ProficiencyLevel, VerifiedSkill},
  skill::Skill,
  store::{ProfileStore, SnapshotWrite, TaxonomyStore},
  user::{NewUser, SkillSource, UserSkill},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn sid(raw: &str) -> SkillId { SkillId::parse(raw).unwrap() }
fn cid(raw: &str) -> CompetencyId { CompetencyId::parse(raw).unwrap() }
fn uid(raw: &str) -> UserId { UserId::parse(raw).unwrap() }

async fn add_skill(s: &SqliteStore, id: &str, parent: Option<&str>) {
  let skill = Skill::new(sid(id), id.to_uppercase(), parent.map(sid)).unwrap();
  assert!(s.add_skill(&skill).await.unwrap());
}

async fn add_competency(s: &SqliteStore, id: &str, name: &str, parent: Option<&str>) {
  let competency = Competency::new(cid(id), name, parent.map(cid)).unwrap();
  assert!(s.add_competency(&competency).await.unwrap());
}

async fn add_user(s: &SqliteStore, id: &str, path_career: Option<&str>) {
  s.upsert_user(NewUser {
    user_id:       uid(id),
    user_name:     "Ada".into(),
    company_id:    "acme".into(),
    employee_type: None,
    path_career:   path_career.map(str::to_owned),
    raw_data:      None,
  })
  .await
  .unwrap();
}

/// React Mastery → React → {Hooks, Context, Router}, with user `u1`.
async fn react_store() -> SqliteStore {
  let s = store().await;
  add_skill(&s, "react", None).await;
  add_skill(&s, "hooks", Some("react")).await;
  add_skill(&s, "context", Some("react")).await;
  add_skill(&s, "router", Some("react")).await;
  add_competency(&s, "react-mastery", "React Mastery", None).await;
  s.link_skill_to_competency(&cid("react-mastery"), &sid("react"))
    .await
    .unwrap();
  add_user(&s, "u1", Some("Frontend Engineer")).await;
  s
}

fn entry(id: &str, verified: bool) -> VerifiedSkill {
  VerifiedSkill {
    skill_id: sid(id),
    skill_name: id.to_uppercase(),
    verified,
    last_update: Utc::now(),
  }
}

// ─── Skills ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_skill() {
  let s = react_store().await;

  let hooks = s.get_skill_by_id(&sid("hooks")).await.unwrap().unwrap();
  assert_eq!(hooks.skill_name, "HOOKS");
  assert_eq!(hooks.parent_skill_id, Some(sid("react")));
  assert!(s.get_skill_by_id(&sid("vue")).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_skill_is_not_inserted() {
  let s = react_store().await;
  let again = Skill::new(sid("hooks"), "Other", None).unwrap();
  assert!(!s.add_skill(&again).await.unwrap());

  let hooks = s.get_skill_by_id(&sid("hooks")).await.unwrap().unwrap();
  assert_eq!(hooks.skill_name, "HOOKS");
}

#[tokio::test]
async fn children_and_roots() {
  let s = react_store().await;
  add_skill(&s, "css", None).await;

  let children = s.get_child_skills(&sid("react")).await.unwrap();
  let ids: Vec<_> = children.iter().map(|c| c.skill_id.as_str()).collect();
  assert_eq!(ids, ["context", "hooks", "router"]);

  let roots = s.list_root_skills().await.unwrap();
  let ids: Vec<_> = roots.iter().map(|r| r.skill_id.as_str()).collect();
  assert_eq!(ids, ["css", "react"]);
}

#[tokio::test]
async fn reparenting_a_skill() {
  let s = react_store().await;
  assert!(
    s.link_parent_child_skill(Some(&sid("hooks")), &sid("router"))
      .await
      .unwrap()
  );
  assert_eq!(s.get_child_skills(&sid("hooks")).await.unwrap().len(), 1);

  assert!(s.link_parent_child_skill(None, &sid("router")).await.unwrap());
  let router = s.get_skill_by_id(&sid("router")).await.unwrap().unwrap();
  assert!(router.is_l1());

  assert!(!s.link_parent_child_skill(None, &sid("ghost")).await.unwrap());
}

#[tokio::test]
async fn deleting_a_skill_cascades() {
  let s = react_store().await;
  s.create_user_competency(&uid("u1"), &cid("react-mastery"))
    .await
    .unwrap();
  s.update_verified_skills(
    &uid("u1"),
    &cid("react-mastery"),
    vec![entry("hooks", true), entry("context", true)],
    CompetencyScore::default(),
    0,
  )
  .await
  .unwrap();
  s.upsert_user_skill(UserSkill {
    user_id:     uid("u1"),
    skill_id:    sid("hooks"),
    skill_name:  "Hooks".into(),
    verified:    true,
    source:      SkillSource::Assessment,
    last_update: Utc::now(),
  })
  .await
  .unwrap();

  assert!(s.delete_skill(&sid("hooks")).await.unwrap());
  let progress = s
    .get_user_competency(&uid("u1"), &cid("react-mastery"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(progress.verified_skills.len(), 1);
  assert!(s.get_user_skills(&uid("u1")).await.unwrap().is_empty());

  assert!(s.delete_skill(&sid("react")).await.unwrap());
  assert!(s.get_skill_by_id(&sid("router")).await.unwrap().is_none());
  assert!(
    s.get_l1_skills_for_competency(&cid("react-mastery"))
      .await
      .unwrap()
      .is_empty()
  );
  assert!(!s.delete_skill(&sid("react")).await.unwrap());
}

// ─── Competencies ────────────────────────────────────────────────────────────

#[tokio::test]
async fn competency_name_lookup_ignores_case_and_padding() {
  let s = react_store().await;
  let found = s.get_competency_by_name("  REACT mastery ").await.unwrap();
  assert_eq!(found.map(|c| c.competency_id), Some(cid("react-mastery")));
  assert!(s.get_competency_by_name("Vue").await.unwrap().is_none());
}

#[tokio::test]
async fn competency_parents_and_children() {
  let s = react_store().await;
  add_competency(&s, "frontend", "Frontend", None).await;
  assert!(
    s.set_competency_parent(&cid("react-mastery"), Some(&cid("frontend")))
      .await
      .unwrap()
  );

  let children = s.get_child_competencies(&cid("frontend")).await.unwrap();
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].parent_competency_id, Some(cid("frontend")));
  assert!(
    !s.set_competency_parent(&cid("ghost"), None)
      .await
      .unwrap()
  );
}

#[tokio::test]
async fn links_are_idempotent_and_l1_only() {
  let s = react_store().await;
  s.link_skill_to_competency(&cid("react-mastery"), &sid("react"))
    .await
    .unwrap();
  // Stored directly; the engine refuses this before it reaches the store.
  s.link_skill_to_competency(&cid("react-mastery"), &sid("hooks"))
    .await
    .unwrap();

  let l1 = s
    .get_l1_skills_for_competency(&cid("react-mastery"))
    .await
    .unwrap();
  assert_eq!(l1.len(), 1);
  assert_eq!(l1[0].skill_id, sid("react"));

  let linked = s.get_competencies_for_skill(&sid("react")).await.unwrap();
  assert_eq!(linked.len(), 1);
}

#[tokio::test]
async fn deleting_a_competency_cascades() {
  let s = react_store().await;
  add_competency(&s, "hooks-deep", "Hooks deep dive", Some("react-mastery")).await;
  s.create_user_competency(&uid("u1"), &cid("react-mastery"))
    .await
    .unwrap();

  assert!(s.delete_competency(&cid("react-mastery")).await.unwrap());
  assert!(s.get_competency_by_id(&cid("hooks-deep")).await.unwrap().is_none());
  assert!(s.get_user_competencies(&uid("u1")).await.unwrap().is_empty());
  assert!(s.get_competencies_for_skill(&sid("react")).await.unwrap().is_empty());
  assert!(!s.delete_competency(&cid("react-mastery")).await.unwrap());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_keeps_score_and_creation_time() {
  let s = react_store().await;
  s.update_relevance_score(&uid("u1"), 42.5).await.unwrap();
  let before = s.get_user_by_id(&uid("u1")).await.unwrap().unwrap();

  let after = s
    .upsert_user(NewUser {
      user_id:       uid("u1"),
      user_name:     "Ada Lovelace".into(),
      company_id:    "acme".into(),
      employee_type: Some("engineer".into()),
      path_career:   None,
      raw_data:      None,
    })
    .await
    .unwrap();

  assert_eq!(after.user_name, "Ada Lovelace");
  assert_eq!(after.relevance_score, 42.5);
  assert_eq!(after.created_at, before.created_at);
  assert_eq!(after.path_career, None);
}

#[tokio::test]
async fn user_skill_upsert_replaces() {
  let s = react_store().await;
  for verified in [true, false] {
    s.upsert_user_skill(UserSkill {
      user_id: uid("u1"),
      skill_id: sid("hooks"),
      skill_name: "Hooks".into(),
      verified,
      source: SkillSource::Certification,
      last_update: Utc::now(),
    })
    .await
    .unwrap();
  }

  let skills = s.get_user_skills(&uid("u1")).await.unwrap();
  assert_eq!(skills.len(), 1);
  assert!(!skills[0].verified);
  assert_eq!(skills[0].source, SkillSource::Certification);
}

// ─── User competencies ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_competency_is_idempotent() {
  let s = react_store().await;
  let first = s
    .create_user_competency(&uid("u1"), &cid("react-mastery"))
    .await
    .unwrap();
  assert_eq!(first.version, 0);
  assert_eq!(first.proficiency_level, None);

  s.update_verified_skills(
    &uid("u1"),
    &cid("react-mastery"),
    vec![entry("hooks", true)],
    CompetencyScore::default(),
    0,
  )
  .await
  .unwrap();
  let second = s
    .create_user_competency(&uid("u1"), &cid("react-mastery"))
    .await
    .unwrap();
  assert_eq!(second.version, 1);
  assert_eq!(second.verified_skills.len(), 1);
}

#[tokio::test]
async fn snapshot_writes_are_versioned() {
  let s = react_store().await;
  let (u, c) = (uid("u1"), cid("react-mastery"));
  let zero = CompetencyScore::default();

  assert_eq!(
    s.update_verified_skills(&u, &c, vec![entry("hooks", true)], zero, 0)
      .await
      .unwrap(),
    SnapshotWrite::Missing
  );

  s.create_user_competency(&u, &c).await.unwrap();
  assert_eq!(
    s.update_verified_skills(&u, &c, vec![entry("hooks", true)], zero, 0)
      .await
      .unwrap(),
    SnapshotWrite::Applied { version: 1 }
  );

  // A writer still holding version 0 loses, and writes nothing.
  assert_eq!(
    s.update_verified_skills(&u, &c, vec![entry("router", true)], zero, 0)
      .await
      .unwrap(),
    SnapshotWrite::Conflict { current: 1 }
  );

  let progress = s.get_user_competency(&u, &c).await.unwrap().unwrap();
  assert_eq!(progress.verified_skills.len(), 1);
  assert_eq!(progress.verified_skills[0].skill_id, sid("hooks"));
}

fn third() -> CompetencyScore {
  CompetencyScore {
    coverage_percentage: 33.33,
    proficiency_level:   ProficiencyLevel::Intermediate,
  }
}

#[tokio::test]
async fn snapshot_write_stores_its_coverage() {
  let s = react_store().await;
  let (u, c) = (uid("u1"), cid("react-mastery"));
  s.create_user_competency(&u, &c).await.unwrap();

  s.update_verified_skills(&u, &c, vec![entry("hooks", true)], third(), 0)
    .await
    .unwrap();

  let progress = s.get_user_competency(&u, &c).await.unwrap().unwrap();
  assert_eq!(progress.version, 1);
  assert_eq!(progress.coverage_percentage, 33.33);
  assert_eq!(progress.proficiency_level, Some(ProficiencyLevel::Intermediate));
}

#[tokio::test]
async fn score_update_is_versioned() {
  let s = react_store().await;
  let stale = CompetencyScore {
    coverage_percentage: 0.0,
    proficiency_level:   ProficiencyLevel::Beginner,
  };
  let (u, c) = (uid("u1"), cid("react-mastery"));

  assert_eq!(
    s.update_user_competency(&u, &c, stale, 0).await.unwrap(),
    SnapshotWrite::Missing
  );

  s.create_user_competency(&u, &c).await.unwrap();
  assert_eq!(
    s.update_user_competency(&u, &c, stale, 0).await.unwrap(),
    SnapshotWrite::Applied { version: 0 }
  );

  s.update_verified_skills(&u, &c, vec![entry("hooks", true)], third(), 0)
    .await
    .unwrap();

  // Coverage computed from the version 0 snapshot no longer applies.
  assert_eq!(
    s.update_user_competency(&u, &c, stale, 0).await.unwrap(),
    SnapshotWrite::Conflict { current: 1 }
  );

  let progress = s.get_user_competency(&u, &c).await.unwrap().unwrap();
  assert_eq!(progress.version, 1);
  assert_eq!(progress.coverage_percentage, 33.33);
  assert_eq!(progress.proficiency_level, Some(ProficiencyLevel::Intermediate));
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn coverage_and_gap_over_sqlite() {
  let s = react_store().await;
  let (u, c) = (uid("u1"), cid("react-mastery"));
  s.create_user_competency(&u, &c).await.unwrap();
  s.update_verified_skills(&u, &c, vec![entry("hooks", true)], CompetencyScore::default(), 0)
    .await
    .unwrap();

  let report = CoverageCalculator::new(&s, &s).coverage(&u, &c).await.unwrap();
  assert_eq!(report.coverage_percentage, 33.33);
  assert_eq!(report.proficiency_level, ProficiencyLevel::Intermediate);

  let gap = GapAnalyzer::new(&s, &s, &Passthrough)
    .broad(&u, ExamStatus::Fail)
    .await
    .unwrap();
  let missing: Vec<_> = gap.missing_skills_map[&c]
    .missing_mgs
    .iter()
    .map(|m| m.skill_id.as_str())
    .collect();
  assert_eq!(missing, ["context", "router"]);
}
