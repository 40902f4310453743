//! Assessment results delivered by the exam service.

use serde::{Deserialize, Serialize};

use crate::id::SkillId;

/// When in the learning cycle an exam was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
  Baseline,
  PostCourse,
}

/// Overall exam outcome, echoed back in gap reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamStatus {
  #[serde(rename = "PASS")]
  Pass,
  #[serde(rename = "FAIL")]
  Fail,
  #[serde(rename = "completed")]
  Completed,
}

/// Per-skill outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SkillStatus {
  Pass,
  Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResult {
  pub skill_id:   SkillId,
  pub skill_name: String,
  pub status:     SkillStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
  pub exam_type:   ExamType,
  pub exam_status: ExamStatus,
  pub course_name: Option<String>,
  pub skills:      Vec<SkillResult>,
}
