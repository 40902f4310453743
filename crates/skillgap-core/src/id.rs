//! String identifiers for skills, competencies and users.
//!
//! Ids are opaque strings assigned by taxonomy administration, discovery or
//! the upstream user directory. They are validated once at the boundary so
//! the engine never computes over empty or oversized keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest id accepted, in bytes.
pub const MAX_ID_LEN: usize = 255;

fn validate(kind: &str, raw: String) -> Result<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{kind} must be a non-empty string")));
  }
  if trimmed.len() > MAX_ID_LEN {
    return Err(Error::Validation(format!(
      "{kind} must not exceed {MAX_ID_LEN} characters"
    )));
  }
  if trimmed.len() == raw.len() {
    Ok(raw)
  } else {
    Ok(trimmed.to_owned())
  }
}

macro_rules! string_id {
  ($(#[$meta:meta])* $name:ident, $kind:literal) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(try_from = "String", into = "String")]
    pub struct $name(String);

    impl $name {
      /// Validate and wrap a raw id.
      pub fn parse(raw: impl Into<String>) -> Result<Self> {
        validate($kind, raw.into()).map(Self)
      }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl TryFrom<String> for $name {
      type Error = Error;

      fn try_from(raw: String) -> Result<Self> { Self::parse(raw) }
    }

    impl From<$name> for String {
      fn from(id: $name) -> String { id.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }
  };
}

string_id!(
  /// Identifier of a [`Skill`](crate::skill::Skill).
  SkillId,
  "skill_id"
);
string_id!(
  /// Identifier of a [`Competency`](crate::competency::Competency).
  CompetencyId,
  "competency_id"
);
string_id!(
  /// Identifier of a [`User`](crate::user::User).
  UserId,
  "user_id"
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_surrounding_whitespace() {
    let id = SkillId::parse("  react  ").unwrap();
    assert_eq!(id.as_str(), "react");
  }

  #[test]
  fn rejects_blank_ids() {
    assert!(matches!(UserId::parse("   "), Err(Error::Validation(_))));
    assert!(matches!(CompetencyId::parse(""), Err(Error::Validation(_))));
  }

  #[test]
  fn rejects_oversized_ids() {
    let raw = "x".repeat(MAX_ID_LEN + 1);
    assert!(matches!(SkillId::parse(raw), Err(Error::Validation(_))));
    assert!(SkillId::parse("x".repeat(MAX_ID_LEN)).is_ok());
  }
}
