//! Skills: the nodes of the skill forest.
//!
//! Skills form trees of unbounded depth through `parent_skill_id`. A skill
//! with no parent is an L1 skill; a skill with no children is a Most Granular
//! Skill (MGS). Whether a skill is an MGS depends on the rest of the tree, so
//! it is answered by the [`HierarchyResolver`](crate::hierarchy::HierarchyResolver),
//! not by the record itself.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, id::SkillId};

/// Longest skill or competency name accepted.
pub const MAX_NAME_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
  pub skill_id:        SkillId,
  pub skill_name:      String,
  pub parent_skill_id: Option<SkillId>,
  pub description:     Option<String>,
}

impl Skill {
  /// Build a skill, validating the name and rejecting self-parenting.
  pub fn new(
    skill_id: SkillId,
    skill_name: impl Into<String>,
    parent_skill_id: Option<SkillId>,
  ) -> Result<Self> {
    let skill = Self {
      skill_id,
      skill_name: skill_name.into(),
      parent_skill_id,
      description: None,
    };
    skill.validate()?;
    Ok(skill)
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// An L1 skill is a root skill: the only kind linkable to a competency.
  pub fn is_l1(&self) -> bool { self.parent_skill_id.is_none() }

  pub fn validate(&self) -> Result<()> {
    validate_name("skill_name", &self.skill_name)?;
    if self.parent_skill_id.as_ref() == Some(&self.skill_id) {
      return Err(Error::Validation("skill cannot be its own parent".into()));
    }
    Ok(())
  }
}

pub(crate) fn validate_name(field: &str, name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::Validation(format!(
      "{field} is required and must be a non-empty string"
    )));
  }
  if name.len() > MAX_NAME_LEN {
    return Err(Error::Validation(format!(
      "{field} must not exceed {MAX_NAME_LEN} characters"
    )));
  }
  Ok(())
}
