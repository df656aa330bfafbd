//! Completeness checks and wire formatting for submissions.

use crate::draft::Draft;
use crate::model::{AnswerPair, Assessment, QuestionId, Submission};

/// Shown when grading fails without a backend message.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit assessment. Please try again.";

/// Whether a draft answers every question of its assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Unanswered questions, in assessment order.
    Incomplete { remaining: Vec<QuestionId> },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

pub fn validate(assessment: &Assessment, draft: &Draft) -> Completeness {
    let remaining: Vec<QuestionId> = assessment
        .questions
        .iter()
        .filter(|q| !draft.contains(&q.question_id))
        .map(|q| q.question_id.clone())
        .collect();
    if remaining.is_empty() {
        Completeness::Complete
    } else {
        Completeness::Incomplete { remaining }
    }
}

/// Build the submission for a complete draft.
///
/// Emits exactly one pair per question, in assessment order, whatever
/// order the draft holds its entries in. Returns `None` while any question
/// is unanswered.
pub fn format_submission(assessment: &Assessment, draft: &Draft) -> Option<Submission> {
    let answers = assessment
        .questions
        .iter()
        .map(|q| {
            draft.get(&q.question_id).map(|selected_option| AnswerPair {
                question_id: q.question_id.clone(),
                selected_option,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Submission {
        assessment_id: assessment.id.clone(),
        answers,
    })
}

pub fn blocked_message(remaining: usize) -> String {
    format!("Please answer all questions. {remaining} questions remaining.")
}

pub fn confirm_prompt(total: usize) -> String {
    format!("You have answered all {total} questions. Submit your answers?")
}
