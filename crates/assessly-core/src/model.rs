//! Core data model types for assessly.
//!
//! Field names follow the backend's camelCase wire format so these types
//! can be (de)serialized directly from and to request/response bodies.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(String);

impl AssessmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssessmentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of a question, unique within its assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: QuestionId,
    pub question_text: String,
    /// Option texts, addressed by 0-based index.
    pub options: Vec<String>,
    /// Shown only after grading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// An assessment definition as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub title: String,
    /// Declared question count. The loader reconciles it with `questions`.
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

/// Why an assessment definition cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeProblem {
    DuplicateQuestion(QuestionId),
    TooFewOptions { question_id: QuestionId, count: usize },
}

impl fmt::Display for ShapeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeProblem::DuplicateQuestion(id) => write!(f, "duplicate question id '{id}'"),
            ShapeProblem::TooFewOptions { question_id, count } => write!(
                f,
                "question '{question_id}' has {count} option(s), at least {MIN_OPTIONS} required"
            ),
        }
    }
}

impl Assessment {
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.question_id == id)
    }

    /// Number of questions actually present.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Whether the declared count matches the question sequence.
    pub fn is_count_consistent(&self) -> bool {
        self.total_questions == self.questions.len()
    }

    /// Check the structural invariants of the question list.
    pub fn validate_shape(&self) -> Result<(), ShapeProblem> {
        let mut seen = HashSet::new();
        for q in &self.questions {
            if !seen.insert(&q.question_id) {
                return Err(ShapeProblem::DuplicateQuestion(q.question_id.clone()));
            }
            if q.options.len() < MIN_OPTIONS {
                return Err(ShapeProblem::TooFewOptions {
                    question_id: q.question_id.clone(),
                    count: q.options.len(),
                });
            }
        }
        Ok(())
    }
}

/// One answered question in a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPair {
    pub question_id: QuestionId,
    pub selected_option: usize,
}

/// The finalized answer set sent for grading. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub assessment_id: AssessmentId,
    pub answers: Vec<AnswerPair>,
}

/// Grading outcome for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub question_text: String,
    pub options: Vec<String>,
    pub user_answer: usize,
    pub correct_answer: usize,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// The scored result returned by the grading service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResult {
    pub score: u32,
    pub total: u32,
    /// Server-assigned, increasing per user and assessment.
    pub attempt_number: u32,
    #[serde(default)]
    pub results: Vec<QuestionOutcome>,
}

impl GradedResult {
    pub fn percentage(&self) -> u32 {
        percentage(self.score, self.total)
    }
}

/// `round(score / total * 100)`, rounding halves up. Zero when `total` is zero.
///
/// Computed in integers so 1/8 gives 13 rather than whatever 12.5 happens
/// to round to in floating point.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score);
    let total = u64::from(total);
    ((score * 200 + total) / (total * 2)) as u32
}
