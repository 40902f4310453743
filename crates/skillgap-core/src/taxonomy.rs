//! Validated taxonomy administration and competency name resolution.
//!
//! The store traits are plain point operations; the hierarchy rules (depth of
//! at most two competency layers, links to L1 skills only, acyclic skill
//! parents) are checked here before anything is written.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  competency::{Competency, normalize_name},
  hierarchy::{HierarchyResolver, MgsSet, TraversalLimits},
  id::{CompetencyId, SkillId},
  normalize::Normalizer,
  skill::Skill,
  store::TaxonomyStore,
};

/// MGS count for one L1 skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMgsCount {
  pub skill_id:   SkillId,
  pub skill_name: String,
  pub mgs_count:  usize,
}

pub struct TaxonomyService<'a, T, N> {
  store:      &'a T,
  normalizer: &'a N,
  limits:     TraversalLimits,
}

impl<'a, T, N> TaxonomyService<'a, T, N>
where
  T: TaxonomyStore,
  N: Normalizer,
{
  pub fn new(store: &'a T, normalizer: &'a N) -> Self {
    Self { store, normalizer, limits: TraversalLimits::default() }
  }

  #[must_use]
  pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
    self.limits = limits;
    self
  }

  fn resolver(&self) -> HierarchyResolver<'a, T> {
    HierarchyResolver::new(self.store).with_limits(self.limits)
  }

  // ─── Lookups ────────────────────────────────────────────────────────────

  pub async fn skill(&self, id: &SkillId) -> Result<Skill> {
    self
      .store
      .get_skill_by_id(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::Skill, id))
  }

  pub async fn competency(&self, id: &CompetencyId) -> Result<Competency> {
    self
      .store
      .get_competency_by_id(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::Competency, id))
  }

  /// L1 skills linked to an existing competency.
  pub async fn l1_skills(&self, id: &CompetencyId) -> Result<Vec<Skill>> {
    self.competency(id).await?;
    self
      .store
      .get_l1_skills_for_competency(id)
      .await
      .map_err(Error::store)
  }

  /// Look a competency up by name.
  ///
  /// The stored names are matched case-insensitively after trimming. On a
  /// miss, the normalizer's canonical spelling gets a second chance; if the
  /// normalizer fails the input string is used as-is.
  pub async fn find_competency(&self, name: &str) -> Result<Option<Competency>> {
    if name.trim().is_empty() {
      return Err(Error::Validation(
        "competency name must be a non-empty string".into(),
      ));
    }

    if let Some(found) = self
      .store
      .get_competency_by_name(name)
      .await
      .map_err(Error::store)?
    {
      return Ok(Some(found));
    }

    let normalized = match self.normalizer.normalize_competency_name(name).await
    {
      Ok(normalized) => normalized,
      Err(e) => {
        warn!(error = %e, name, "name normalization failed; using input");
        name.to_owned()
      }
    };
    if normalize_name(&normalized) == normalize_name(name)
      || normalized.trim().is_empty()
    {
      return Ok(None);
    }

    debug!(name, %normalized, "retrying competency lookup with normalized name");
    self
      .store
      .get_competency_by_name(&normalized)
      .await
      .map_err(Error::store)
  }

  /// Resolve a competency by name and compute its MGS.
  ///
  /// With `discover` set, a name unknown locally is handed to the
  /// normalizer's discovery; a discovered competency is stored (as a
  /// top-level competency with no links) before its MGS are resolved.
  pub async fn mgs_for_competency_name(
    &self,
    name: &str,
    discover: bool,
  ) -> Result<(Competency, MgsSet)> {
    let competency = match self.find_competency(name).await? {
      Some(found) => found,
      None if discover => self.discover(name).await?,
      None => return Err(Error::not_found(EntityKind::Competency, name.trim())),
    };

    let mgs = self
      .resolver()
      .resolve_mgs_for_competency(&competency.competency_id)
      .await?;
    Ok((competency, mgs))
  }

  async fn discover(&self, name: &str) -> Result<Competency> {
    let discovered = match self.normalizer.discover_competency(name).await {
      Ok(Some(discovered)) => discovered,
      Ok(None) => {
        return Err(Error::not_found(EntityKind::Competency, name.trim()));
      }
      Err(e) => {
        warn!(error = %e, name, "competency discovery failed");
        return Err(Error::not_found(EntityKind::Competency, name.trim()));
      }
    };

    let id = match discovered.competency_id.as_deref().map(str::trim) {
      Some(raw) if !raw.is_empty() => CompetencyId::parse(raw)?,
      _ => CompetencyId::parse(format!("comp_{}", Uuid::new_v4().simple()))?,
    };
    let mut competency = Competency::new(id, discovered.competency_name, None)?;
    competency.description = discovered.description;

    let inserted = self
      .store
      .add_competency(&competency)
      .await
      .map_err(Error::store)?;
    if !inserted {
      // Another request stored the same discovered id first.
      return self.competency(&competency.competency_id).await;
    }

    info!(competency_id = %competency.competency_id, "stored discovered competency");
    Ok(competency)
  }

  /// MGS count for every L1 skill. Computed fresh on every call.
  pub async fn mgs_counts_for_roots(&self) -> Result<Vec<RootMgsCount>> {
    let roots = self.store.list_root_skills().await.map_err(Error::store)?;
    let resolver = self.resolver();

    let mut counts = Vec::with_capacity(roots.len());
    for root in roots {
      let mgs = resolver.resolve_mgs(&root.skill_id).await?;
      counts.push(RootMgsCount {
        skill_id:   root.skill_id,
        skill_name: root.skill_name,
        mgs_count:  mgs.len(),
      });
    }
    Ok(counts)
  }

  // ─── Skills ─────────────────────────────────────────────────────────────

  /// Insert a new skill. The parent, if named, must already exist.
  pub async fn add_skill(&self, skill: Skill) -> Result<Skill> {
    skill.validate()?;
    if let Some(parent) = &skill.parent_skill_id {
      self.skill(parent).await?;
    }

    let inserted = self.store.add_skill(&skill).await.map_err(Error::store)?;
    if !inserted {
      return Err(Error::Validation(format!(
        "skill {} already exists",
        skill.skill_id
      )));
    }
    debug!(skill_id = %skill.skill_id, "skill added");
    Ok(skill)
  }

  /// Re-parent a skill, or make it an L1 skill with `None`.
  pub async fn move_skill(
    &self,
    id: &SkillId,
    new_parent: Option<&SkillId>,
  ) -> Result<Skill> {
    let mut skill = self.skill(id).await?;

    if let Some(parent) = new_parent {
      if parent == id {
        return Err(Error::CyclicHierarchy {
          skill:  id.clone(),
          parent: parent.clone(),
        });
      }
      self.skill(parent).await?;
      if self.is_ancestor(id, parent).await? {
        return Err(Error::CyclicHierarchy {
          skill:  id.clone(),
          parent: parent.clone(),
        });
      }
    }

    let moved = self
      .store
      .link_parent_child_skill(new_parent, id)
      .await
      .map_err(Error::store)?;
    if !moved {
      return Err(Error::not_found(EntityKind::Skill, id));
    }

    skill.parent_skill_id = new_parent.cloned();
    debug!(skill_id = %id, parent = ?new_parent, "skill moved");
    Ok(skill)
  }

  /// Whether `ancestor` lies on the parent chain above `skill`.
  async fn is_ancestor(&self, ancestor: &SkillId, skill: &SkillId) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(skill.clone());

    while let Some(id) = current {
      if &id == ancestor {
        return Ok(true);
      }
      if !seen.insert(id.clone()) {
        warn!(skill_id = %id, "cycle in stored skill parents");
        return Ok(false);
      }
      current = self
        .store
        .get_skill_by_id(&id)
        .await
        .map_err(Error::store)?
        .and_then(|s| s.parent_skill_id);
    }
    Ok(false)
  }

  pub async fn delete_skill(&self, id: &SkillId) -> Result<()> {
    if !self.store.delete_skill(id).await.map_err(Error::store)? {
      return Err(Error::not_found(EntityKind::Skill, id));
    }
    debug!(skill_id = %id, "skill deleted");
    Ok(())
  }

  // ─── Competencies ───────────────────────────────────────────────────────

  /// Insert a new competency. A parent must exist and must itself be a
  /// top-level competency.
  pub async fn add_competency(&self, competency: Competency) -> Result<Competency> {
    competency.validate()?;
    if let Some(parent_id) = &competency.parent_competency_id {
      let parent = self.competency(parent_id).await?;
      if parent.is_child() {
        return Err(Error::HierarchyDepth(parent.competency_id));
      }
    }

    let inserted = self
      .store
      .add_competency(&competency)
      .await
      .map_err(Error::store)?;
    if !inserted {
      return Err(Error::Validation(format!(
        "competency {} already exists",
        competency.competency_id
      )));
    }
    debug!(competency_id = %competency.competency_id, "competency added");
    Ok(competency)
  }

  /// Attach a competency under `parent`, or detach it with `None`.
  ///
  /// Refused when `parent` is itself a child, and when the competency being
  /// moved already has children of its own.
  pub async fn set_competency_parent(
    &self,
    id: &CompetencyId,
    parent: Option<&CompetencyId>,
  ) -> Result<Competency> {
    let mut competency = self.competency(id).await?;

    if let Some(parent_id) = parent {
      if parent_id == id {
        return Err(Error::Validation(
          "competency cannot be its own parent".into(),
        ));
      }
      let parent = self.competency(parent_id).await?;
      if parent.is_child() {
        return Err(Error::HierarchyDepth(parent.competency_id));
      }
      let children = self
        .store
        .get_child_competencies(id)
        .await
        .map_err(Error::store)?;
      if !children.is_empty() {
        return Err(Error::HierarchyDepth(id.clone()));
      }
    }

    let updated = self
      .store
      .set_competency_parent(id, parent)
      .await
      .map_err(Error::store)?;
    if !updated {
      return Err(Error::not_found(EntityKind::Competency, id));
    }

    competency.parent_competency_id = parent.cloned();
    Ok(competency)
  }

  /// Link an L1 skill to a competency. Linking twice is a no-op.
  pub async fn link_skill_to_competency(
    &self,
    competency: &CompetencyId,
    skill: &SkillId,
  ) -> Result<()> {
    self.competency(competency).await?;
    let skill_record = self.skill(skill).await?;
    if !skill_record.is_l1() {
      return Err(Error::NotL1Skill(skill.clone()));
    }

    self
      .store
      .link_skill_to_competency(competency, skill)
      .await
      .map_err(Error::store)?;
    debug!(competency_id = %competency, skill_id = %skill, "skill linked");
    Ok(())
  }

  pub async fn delete_competency(&self, id: &CompetencyId) -> Result<()> {
    if !self.store.delete_competency(id).await.map_err(Error::store)? {
      return Err(Error::not_found(EntityKind::Competency, id));
    }
    debug!(competency_id = %id, "competency deleted");
    Ok(())
  }
}
