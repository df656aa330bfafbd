//! Mock backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use assessly_core::error::BackendError;
use assessly_core::model::{Assessment, AssessmentId, GradedResult, QuestionOutcome, Submission};
use assessly_core::session::SessionContext;
use assessly_core::traits::{AccessGate, AssessmentBackend};

struct Entry {
    assessment: Assessment,
    /// Correct option per question, in question order.
    answer_key: Vec<usize>,
    attempts: u32,
}

/// An in-process backend that serves and grades assessments.
///
/// Grading compares each submitted option with the answer key. Submit
/// failures can be scripted ahead of time and are consumed in order.
#[derive(Default)]
pub struct MockBackend {
    entries: Mutex<HashMap<AssessmentId, Entry>>,
    denied: Mutex<Vec<AssessmentId>>,
    scripted_failures: Mutex<Vec<BackendError>>,
    fetch_count: AtomicU32,
    submit_count: AtomicU32,
    last_submission: Mutex<Option<Submission>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `assessment`, grading against `answer_key`.
    pub fn with_assessment(self, assessment: Assessment, answer_key: Vec<usize>) -> Self {
        self.entries.lock().unwrap().insert(
            assessment.id.clone(),
            Entry {
                assessment,
                answer_key,
                attempts: 0,
            },
        );
        self
    }

    /// Make the access gate refuse `id`.
    pub fn deny(self, id: &AssessmentId) -> Self {
        self.denied.lock().unwrap().push(id.clone());
        self
    }

    /// Fail the next submission with `err`.
    pub fn fail_next_submit(&self, err: BackendError) {
        self.scripted_failures.lock().unwrap().push(err);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Submissions received, including failed ones.
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.last_submission.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssessmentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_assessment(
        &self,
        _session: &SessionContext,
        id: &AssessmentId,
    ) -> anyhow::Result<Assessment> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|e| e.assessment.clone())
            .ok_or_else(|| {
                BackendError::NotFound {
                    message: Some(format!("Assessment '{id}' not found")),
                }
                .into()
            })
    }

    async fn submit_assessment(
        &self,
        _session: &SessionContext,
        submission: &Submission,
    ) -> anyhow::Result<GradedResult> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);
        *self.last_submission.lock().unwrap() = Some(submission.clone());

        {
            let mut failures = self.scripted_failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0).into());
            }
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&submission.assessment_id)
            .ok_or(BackendError::NotFound { message: None })?;

        let mut results = Vec::with_capacity(entry.assessment.questions.len());
        for (question, correct) in entry.assessment.questions.iter().zip(&entry.answer_key) {
            let user_answer = submission
                .answers
                .iter()
                .find(|a| a.question_id == question.question_id)
                .map(|a| a.selected_option)
                .ok_or_else(|| BackendError::Rejected {
                    status: 400,
                    message: Some(format!("Missing answer for {}", question.question_id)),
                })?;
            results.push(QuestionOutcome {
                question_id: question.question_id.clone(),
                question_text: question.question_text.clone(),
                options: question.options.clone(),
                user_answer,
                correct_answer: *correct,
                is_correct: user_answer == *correct,
                explanation: question.explanation.clone(),
            });
        }

        entry.attempts += 1;
        Ok(GradedResult {
            score: results.iter().filter(|r| r.is_correct).count() as u32,
            total: entry.assessment.total_questions as u32,
            attempt_number: entry.attempts,
            results,
        })
    }
}

#[async_trait]
impl AccessGate for MockBackend {
    async fn is_allowed(&self, _: &SessionContext, id: &AssessmentId) -> anyhow::Result<bool> {
        Ok(!self.denied.lock().unwrap().contains(id))
    }
}
