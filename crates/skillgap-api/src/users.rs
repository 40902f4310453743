//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: a new user; `raw_data` seeds competencies |
//! | `GET`  | `/users/{user_id}/profile` | Competency profile |
//! | `GET`  | `/users/{user_id}/gaps` | `?course_name=` for one competency, else by career path |
//! | `POST` | `/users/{user_id}/assessments` | Records results, recomputes coverage |
//! | `POST` | `/users/{user_id}/competencies/{competency_id}/coverage` | Recompute one competency |
//! | `POST` | `/users/{user_id}/relevance` | Recompute the relevance score |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use skillgap_core::{
  CompetencyId, UserId,
  assessment::{AssessmentResult, ExamStatus},
  coverage::CoverageCalculator,
  gap::GapAnalyzer,
  normalize::Normalizer,
  profile::ProfileService,
  relevance::RelevanceScorer,
  user::NewUser,
  verification::VerificationService,
};

use crate::{AppState, SkillgapStore, envelope, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  body: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let Json(new_user) = body?;
  let created = ProfileService::new(&*state.store, &*state.store, &*state.normalizer)
    .with_limits(state.limits)
    .create_profile(new_user)
    .await?;
  Ok(envelope::created(created))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /users/{user_id}/profile`
pub async fn profile<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let user_id = UserId::parse(user_id)?;
  let profile = ProfileService::new(&*state.store, &*state.store, &*state.normalizer)
    .with_limits(state.limits)
    .get_profile(&user_id)
    .await?;
  Ok(envelope::ok(profile))
}

// ─── Gaps ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GapParams {
  pub course_name: Option<String>,
  pub exam_status: Option<ExamStatus>,
}

/// `GET /users/{user_id}/gaps[?course_name=..][&exam_status=PASS|FAIL|completed]`
///
/// With a course name the analysis is narrowed to that competency; without
/// one it covers every competency on the user's career path.
pub async fn gaps<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
  params: Result<Query<GapParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let user_id = UserId::parse(user_id)?;
  let Query(params) = params?;
  let exam_status = params.exam_status.unwrap_or(ExamStatus::Completed);

  let analyzer = GapAnalyzer::new(&*state.store, &*state.store, &*state.normalizer)
    .with_limits(state.limits);
  let course = params
    .course_name
    .as_deref()
    .map(str::trim)
    .filter(|c| !c.is_empty());
  let result = match course {
    Some(course) => analyzer.narrow(&user_id, course, exam_status).await?,
    None => analyzer.broad(&user_id, exam_status).await?,
  };
  Ok(envelope::ok(result))
}

// ─── Assessments ──────────────────────────────────────────────────────────────

/// `POST /users/{user_id}/assessments`
pub async fn assessment<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
  body: Result<Json<AssessmentResult>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let user_id = UserId::parse(user_id)?;
  let Json(assessment) = body?;
  let outcome = VerificationService::new(&*state.store, &*state.store)
    .with_limits(state.limits)
    .record_assessment(&user_id, assessment)
    .await?;
  Ok(envelope::ok(outcome))
}

// ─── Coverage ─────────────────────────────────────────────────────────────────

/// `POST /users/{user_id}/competencies/{competency_id}/coverage`
pub async fn coverage<S, N>(
  State(state): State<AppState<S, N>>,
  Path((user_id, competency_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let user_id = UserId::parse(user_id)?;
  let competency_id = CompetencyId::parse(competency_id)?;
  let report = CoverageCalculator::new(&*state.store, &*state.store)
    .with_limits(state.limits)
    .coverage(&user_id, &competency_id)
    .await?;
  Ok(envelope::ok(report))
}

// ─── Relevance ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RelevanceBody {
  pub user_id:         UserId,
  pub relevance_score: f64,
}

/// `POST /users/{user_id}/relevance`
pub async fn relevance<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SkillgapStore,
  N: Normalizer,
{
  let user_id = UserId::parse(user_id)?;
  let relevance_score = RelevanceScorer::new(&*state.store, &*state.store)
    .with_limits(state.limits)
    .calculate_relevance_score(&user_id)
    .await?;
  Ok(envelope::ok(RelevanceBody { user_id, relevance_score }))
}
