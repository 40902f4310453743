//! Competencies: named bundles of L1 skills.
//!
//! Competencies nest at most two layers deep: a competency that already has a
//! parent cannot be given children. The rule is enforced by
//! [`TaxonomyService`](crate::taxonomy::TaxonomyService) at write time, not by
//! storage.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, id::CompetencyId, skill::validate_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
  pub competency_id:        CompetencyId,
  pub competency_name:      String,
  pub description:          Option<String>,
  pub parent_competency_id: Option<CompetencyId>,
}

impl Competency {
  pub fn new(
    competency_id: CompetencyId,
    competency_name: impl Into<String>,
    parent_competency_id: Option<CompetencyId>,
  ) -> Result<Self> {
    let competency = Self {
      competency_id,
      competency_name: competency_name.into(),
      description: None,
      parent_competency_id,
    };
    competency.validate()?;
    Ok(competency)
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// `true` for a second-layer competency, which cannot take children.
  pub fn is_child(&self) -> bool { self.parent_competency_id.is_some() }

  pub fn validate(&self) -> Result<()> {
    validate_name("competency_name", &self.competency_name)?;
    if self.parent_competency_id.as_ref() == Some(&self.competency_id) {
      return Err(Error::Validation(
        "competency cannot be its own parent".into(),
      ));
    }
    Ok(())
  }
}

/// Canonical form used for name lookups: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String { name.trim().to_lowercase() }
