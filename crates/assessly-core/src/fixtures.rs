//! Shared test fixtures.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::BackendError;
use crate::model::{Assessment, AssessmentId, GradedResult, Question, QuestionOutcome, Submission};
use crate::session::SessionContext;
use crate::traits::AssessmentBackend;

pub fn sample_assessment(id: &str, questions: usize) -> Assessment {
    Assessment {
        id: id.into(),
        title: format!("Assessment {id}"),
        total_questions: questions,
        questions: (1..=questions)
            .map(|n| Question {
                question_id: format!("q{n}").as_str().into(),
                question_text: format!("Question {n}?"),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                explanation: (n % 2 == 1).then(|| format!("Because of rule {n}.")),
            })
            .collect(),
    }
}

/// A result over `q1..q{total}` where the first `score` questions are correct.
pub fn graded(score: u32, total: u32, attempt: u32) -> GradedResult {
    GradedResult {
        score,
        total,
        attempt_number: attempt,
        results: (1..=total)
            .map(|n| QuestionOutcome {
                question_id: format!("q{n}").as_str().into(),
                question_text: format!("Question {n}?"),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                user_answer: 0,
                correct_answer: if n <= score { 0 } else { 1 },
                is_correct: n <= score,
                explanation: None,
            })
            .collect(),
    }
}

/// Backend stub with a fixed fetch outcome and a queue of submit outcomes.
pub struct StubBackend {
    pub fetch: Mutex<Option<anyhow::Result<Assessment>>>,
    pub submits: Mutex<Vec<anyhow::Result<GradedResult>>>,
    pub received: Mutex<Vec<Submission>>,
    hold: Option<Notify>,
}

impl StubBackend {
    pub fn serving(assessment: Assessment) -> Self {
        Self {
            fetch: Mutex::new(Some(Ok(assessment))),
            submits: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            hold: None,
        }
    }

    pub fn failing(err: BackendError) -> Self {
        Self {
            fetch: Mutex::new(Some(Err(err.into()))),
            submits: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            hold: None,
        }
    }

    pub fn then_submit(self, outcome: anyhow::Result<GradedResult>) -> Self {
        self.submits.lock().unwrap().push(outcome);
        self
    }

    /// Every call waits for a matching [`release`](Self::release).
    pub fn held(mut self) -> Self {
        self.hold = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.notify_one();
        }
    }

    async fn wait_for_release(&self) {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
    }
}

#[async_trait]
impl AssessmentBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_assessment(
        &self,
        _: &SessionContext,
        _: &AssessmentId,
    ) -> anyhow::Result<Assessment> {
        self.wait_for_release().await;
        let mut slot = self.fetch.lock().unwrap();
        match slot.take() {
            Some(Ok(assessment)) => {
                *slot = Some(Ok(assessment.clone()));
                Ok(assessment)
            }
            // Errors are one-shot; later fetches see "not found".
            Some(Err(e)) => Err(e),
            None => Err(BackendError::NotFound { message: None }.into()),
        }
    }

    async fn submit_assessment(
        &self,
        _: &SessionContext,
        submission: &Submission,
    ) -> anyhow::Result<GradedResult> {
        self.received.lock().unwrap().push(submission.clone());
        self.wait_for_release().await;
        let mut queue = self.submits.lock().unwrap();
        if queue.is_empty() {
            anyhow::bail!("no scripted submit outcome");
        }
        queue.remove(0)
    }
}

