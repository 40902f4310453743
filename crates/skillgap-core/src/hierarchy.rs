//! Hierarchy resolution: from a skill or competency down to its Most Granular
//! Skills.
//!
//! Both walks are iterative (explicit worklist) and carry a visited set, so
//! they terminate on cyclic or otherwise malformed taxonomy data. A node
//! budget bounds the total work per resolution.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::{
  EntityKind, Error, Result,
  id::{CompetencyId, SkillId},
  skill::Skill,
  store::TaxonomyStore,
};

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Bounds applied to a single resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
  /// Maximum number of skill and competency nodes expanded before the walk
  /// fails with [`Error::HierarchyTooLarge`].
  pub max_nodes: usize,
}

impl Default for TraversalLimits {
  fn default() -> Self { Self { max_nodes: 10_000 } }
}

// ─── MGS set ─────────────────────────────────────────────────────────────────

/// A set of Most Granular Skills, keyed and iterated by skill id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MgsSet(BTreeMap<SkillId, Skill>);

impl MgsSet {
  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, id: &SkillId) -> bool { self.0.contains_key(id) }

  pub fn ids(&self) -> impl Iterator<Item = &SkillId> { self.0.keys() }

  pub fn iter(&self) -> impl Iterator<Item = &Skill> { self.0.values() }

  /// Number of members whose id is in `verified`.
  pub fn count_verified(&self, verified: &HashSet<&SkillId>) -> usize {
    self.ids().filter(|id| verified.contains(id)).count()
  }

  pub fn into_skills(self) -> Vec<Skill> { self.0.into_values().collect() }

  fn insert(&mut self, skill: Skill) { self.0.insert(skill.skill_id.clone(), skill); }
}

// ─── Walk state ──────────────────────────────────────────────────────────────

struct Walk {
  limit:    usize,
  expanded: usize,
  seen:     HashSet<SkillId>,
  leaves:   MgsSet,
}

impl Walk {
  fn new(limits: TraversalLimits) -> Self {
    Self {
      limit:    limits.max_nodes,
      expanded: 0,
      seen:     HashSet::new(),
      leaves:   MgsSet::default(),
    }
  }

  fn charge(&mut self) -> Result<()> {
    self.expanded += 1;
    if self.expanded > self.limit {
      return Err(Error::HierarchyTooLarge { limit: self.limit });
    }
    Ok(())
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Computes MGS sets against a [`TaxonomyStore`].
///
/// The resolver holds no cache: every call reads the store, so results always
/// reflect the stored hierarchy at call time.
pub struct HierarchyResolver<'a, T> {
  store:  &'a T,
  limits: TraversalLimits,
}

impl<'a, T: TaxonomyStore> HierarchyResolver<'a, T> {
  pub fn new(store: &'a T) -> Self {
    Self { store, limits: TraversalLimits::default() }
  }

  #[must_use]
  pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
    self.limits = limits;
    self
  }

  /// All MGS reachable from `root`, the root itself if it has no children.
  ///
  /// Returns [`Error::NotFound`] if `root` does not exist.
  pub async fn resolve_mgs(&self, root: &SkillId) -> Result<MgsSet> {
    let skill = self
      .store
      .get_skill_by_id(root)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::Skill, root))?;

    let mut walk = Walk::new(self.limits);
    self.collect_leaves(skill, &mut walk).await?;
    Ok(walk.leaves)
  }

  /// The union of MGS over every L1 skill linked to `competency` and,
  /// recursively, to each of its child competencies.
  ///
  /// Returns [`Error::NotFound`] if `competency` does not exist, and an empty
  /// set if it has neither links nor children.
  pub async fn resolve_mgs_for_competency(
    &self,
    competency: &CompetencyId,
  ) -> Result<MgsSet> {
    if self
      .store
      .get_competency_by_id(competency)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::not_found(EntityKind::Competency, competency));
    }

    let mut walk = Walk::new(self.limits);
    let mut seen_competencies: HashSet<CompetencyId> = HashSet::new();
    let mut pending = vec![competency.clone()];

    while let Some(current) = pending.pop() {
      if !seen_competencies.insert(current.clone()) {
        warn!(competency_id = %current, "competency reached twice; skipping");
        continue;
      }
      walk.charge()?;

      let l1_skills = self
        .store
        .get_l1_skills_for_competency(&current)
        .await
        .map_err(Error::store)?;
      for skill in l1_skills {
        self.collect_leaves(skill, &mut walk).await?;
      }

      let children = self
        .store
        .get_child_competencies(&current)
        .await
        .map_err(Error::store)?;
      pending.extend(children.into_iter().map(|c| c.competency_id));
    }

    debug!(
      competency_id = %competency,
      mgs = walk.leaves.len(),
      expanded = walk.expanded,
      "resolved competency MGS"
    );
    Ok(walk.leaves)
  }

  /// Depth-first walk from `root`, adding leaves to `walk.leaves`.
  ///
  /// Skills already expanded in this resolution are skipped, which both
  /// deduplicates shared subtrees and breaks cycles.
  async fn collect_leaves(&self, root: Skill, walk: &mut Walk) -> Result<()> {
    let mut stack = vec![root];

    while let Some(skill) = stack.pop() {
      if !walk.seen.insert(skill.skill_id.clone()) {
        debug!(skill_id = %skill.skill_id, "skill already visited");
        continue;
      }
      walk.charge()?;

      let children = self
        .store
        .get_child_skills(&skill.skill_id)
        .await
        .map_err(Error::store)?;

      if children.is_empty() {
        walk.leaves.insert(skill);
      } else {
        stack.extend(children);
      }
    }

    Ok(())
  }
}
