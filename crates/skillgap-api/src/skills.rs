//! Handlers for `/skills` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/skills` | Parent must exist; 400 on a duplicate id |
//! | `GET`    | `/skills/{skill_id}` | 404 if not found |
//! | `DELETE` | `/skills/{skill_id}` | Deletes the whole subtree |
//! | `PUT`    | `/skills/{skill_id}/parent` | Body: `{"parent_skill_id": ".."\|null}` |
//! | `GET`    | `/skills/{skill_id}/mgs` | Most granular skills under the skill |
//! | `GET`    | `/skills/mgs-counts` | MGS count for every L1 skill |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skillgap_core::{
  SkillId,
  hierarchy::HierarchyResolver,
  normalize::Normalizer,
  skill::Skill,
  taxonomy::TaxonomyService,
};

use crate::{AppState, SkillgapStore, envelope, error::ApiError};

fn taxonomy<S, N>(state: &AppState<S, N>) -> TaxonomyService<'_, S, N>
where
  S: SkillgapStore,
  N: Normalizer,
{
  TaxonomyService::new(&*state.store, &*state.normalizer).with_limits(state.limits)
}

// ─── Create / read / delete ───────────────────────────────────────────────────

/// `POST /skills`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  body: Result<Json<Skill>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let Json(skill) = body?;
  let skill = taxonomy(&state).add_skill(skill).await?;
  Ok(envelope::created(skill))
}

/// `GET /skills/{skill_id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let skill_id = SkillId::parse(skill_id)?;
  Ok(envelope::ok(taxonomy(&state).skill(&skill_id).await?))
}

/// `DELETE /skills/{skill_id}`
pub async fn delete_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let skill_id = SkillId::parse(skill_id)?;
  taxonomy(&state).delete_skill(&skill_id).await?;
  Ok(envelope::ok(json!({ "skill_id": skill_id, "deleted": true })))
}

// ─── Re-parent ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParentBody {
  #[serde(default)]
  pub parent_skill_id: Option<SkillId>,
}

/// `PUT /skills/{skill_id}/parent`
///
/// A `null` parent makes the skill an L1 skill.
pub async fn set_parent<S, N>(
  State(state): State<AppState<S, N>>,
  Path(skill_id): Path<String>,
  body: Result<Json<ParentBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let skill_id = SkillId::parse(skill_id)?;
  let Json(body) = body?;
  let skill = taxonomy(&state)
    .move_skill(&skill_id, body.parent_skill_id.as_ref())
    .await?;
  Ok(envelope::ok(skill))
}

// ─── MGS ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SkillMgsBody {
  pub skill:     Skill,
  pub mgs_count: usize,
  pub mgs:       Vec<Skill>,
}

/// `GET /skills/{skill_id}/mgs`
pub async fn mgs<S, N>(
  State(state): State<AppState<S, N>>,
  Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let skill_id = SkillId::parse(skill_id)?;
  let skill = taxonomy(&state).skill(&skill_id).await?;
  let mgs = HierarchyResolver::new(&*state.store)
    .with_limits(state.limits)
    .resolve_mgs(&skill_id)
    .await?;
  Ok(envelope::ok(SkillMgsBody {
    skill,
    mgs_count: mgs.len(),
    mgs: mgs.into_skills(),
  }))
}

/// `GET /skills/mgs-counts`
pub async fn mgs_counts<S, N>(
  State(state): State<AppState<S, N>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  Ok(envelope::ok(taxonomy(&state).mgs_counts_for_roots().await?))
}
