//! Core types, store traits and the gap/coverage engine for skillgap.
//!
//! This crate is free of HTTP and database dependencies. Storage
//! backends implement [`store::TaxonomyStore`] and [`store::ProfileStore`];
//! the engine components borrow those stores for the duration of a request.

pub mod assessment;
pub mod competency;
pub mod coverage;
pub mod error;
pub mod gap;
pub mod hierarchy;
pub mod id;
pub mod normalize;
pub mod profile;
pub mod progress;
pub mod relevance;
pub mod skill;
pub mod store;
pub mod taxonomy;
pub mod user;
pub mod verification;

pub use error::{EntityKind, Error, Result};
pub use id::{CompetencyId, SkillId, UserId};

#[cfg(test)]
mod fake;
