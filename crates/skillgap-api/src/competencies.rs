//! Handlers for `/competencies` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/competencies` | At most two layers deep |
//! | `GET`    | `/competencies/{competency_id}` | 404 if not found |
//! | `DELETE` | `/competencies/{competency_id}` | Children are deleted with it |
//! | `PUT`    | `/competencies/{competency_id}/parent` | Body: `{"parent_competency_id": ".."\|null}` |
//! | `GET`    | `/competencies/{competency_id}/mgs` | Required MGS |
//! | `GET`    | `/competencies/mgs` | `?name=..[&discover=true]` |
//! | `GET`    | `/competencies/{competency_id}/skills` | Linked L1 skills |
//! | `POST`   | `/competencies/{competency_id}/skills` | Body: `{"skill_id": ".."}` |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skillgap_core::{
  CompetencyId, SkillId,
  competency::Competency,
  hierarchy::{HierarchyResolver, MgsSet},
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

/// `POST /competencies`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  body: Result<Json<Competency>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let Json(competency) = body?;
  let competency = taxonomy(&state).add_competency(competency).await?;
  Ok(envelope::created(competency))
}

/// `GET /competencies/{competency_id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  Ok(envelope::ok(taxonomy(&state).competency(&competency_id).await?))
}

/// `DELETE /competencies/{competency_id}`
pub async fn delete_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  taxonomy(&state).delete_competency(&competency_id).await?;
  Ok(envelope::ok(json!({ "competency_id": competency_id, "deleted": true })))
}

// ─── Re-parent ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParentBody {
  #[serde(default)]
  pub parent_competency_id: Option<CompetencyId>,
}

/// `PUT /competencies/{competency_id}/parent`
pub async fn set_parent<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
  body: Result<Json<ParentBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  let Json(body) = body?;
  let competency = taxonomy(&state)
    .set_competency_parent(&competency_id, body.parent_competency_id.as_ref())
    .await?;
  Ok(envelope::ok(competency))
}

// ─── MGS ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CompetencyMgsBody {
  pub competency: Competency,
  pub mgs_count:  usize,
  pub mgs:        Vec<Skill>,
}

impl CompetencyMgsBody {
  fn new(competency: Competency, mgs: MgsSet) -> Self {
    Self { competency, mgs_count: mgs.len(), mgs: mgs.into_skills() }
  }
}

/// `GET /competencies/{competency_id}/mgs`
pub async fn mgs<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  let competency = taxonomy(&state).competency(&competency_id).await?;
  let mgs = HierarchyResolver::new(&*state.store)
    .with_limits(state.limits)
    .resolve_mgs_for_competency(&competency_id)
    .await?;
  Ok(envelope::ok(CompetencyMgsBody::new(competency, mgs)))
}

#[derive(Debug, Deserialize)]
pub struct MgsByNameParams {
  pub name:     String,
  #[serde(default)]
  pub discover: bool,
}

/// `GET /competencies/mgs?name=..[&discover=true]`
///
/// With `discover=true` a name unknown locally is looked up through the
/// normalization service and stored.
pub async fn mgs_by_name<S, N>(
  State(state): State<AppState<S, N>>,
  params: Result<Query<MgsByNameParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let Query(params) = params?;
  let (competency, mgs) = taxonomy(&state)
    .mgs_for_competency_name(&params.name, params.discover)
    .await?;
  Ok(envelope::ok(CompetencyMgsBody::new(competency, mgs)))
}

// ─── Skill links ──────────────────────────────────────────────────────────────

/// `GET /competencies/{competency_id}/skills`
pub async fn skills<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  Ok(envelope::ok(taxonomy(&state).l1_skills(&competency_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub skill_id: SkillId,
}

/// `POST /competencies/{competency_id}/skills`
///
/// Only L1 skills can be linked. Linking twice is a no-op.
pub async fn link_skill<S, N>(
  State(state): State<AppState<S, N>>,
  Path(competency_id): Path<String>,
  body: Result<Json<LinkBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let competency_id = CompetencyId::parse(competency_id)?;
  let Json(body) = body?;
  let service = taxonomy(&state);
  service
    .link_skill_to_competency(&competency_id, &body.skill_id)
    .await?;
  Ok(envelope::created(service.l1_skills(&competency_id).await?))
}
