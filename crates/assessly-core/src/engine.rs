//! Attempt orchestration.
//!
//! An [`AttemptSession`] drives one attempt through
//! `composing → {blocked | confirming} → submitting → {reviewing | composing}`.
//! It owns the answer collector while composing and the graded result
//! while reviewing. [`Engine`] wires the loader, draft store, and grading
//! client together and opens attempts.
//!
//! Callers that need a busy indicator hold a clone of the attempt's
//! [`Teardown`] and read [`Teardown::activity`]; it reports
//! [`Activity::Submitting`] for as long as the grading call is outstanding.

use std::sync::Arc;

use tracing::instrument;

use crate::collector::AnswerCollector;
use crate::draft::DraftStore;
use crate::error::{user_message, AttemptError};
use crate::grading::GradingClient;
use crate::loader::{AssessmentLoader, LoadState};
use crate::model::{Assessment, AssessmentId, GradedResult, QuestionId};
use crate::results::ResultsView;
use crate::session::SessionContext;
use crate::submission::{format_submission, validate, Completeness, SUBMIT_FAILED_MESSAGE};
use crate::task::{Activity, Teardown};
use crate::traits::{AccessGate, AssessmentBackend, OpenGate};

/// Where an attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Answers may be changed.
    Composing,
    /// Submit was requested with questions still unanswered.
    Blocked { remaining: usize },
    /// Every question is answered; waiting for an explicit yes or no.
    Confirming { total: usize },
    /// The grading request is outstanding. Nothing may change. A torn-down
    /// attempt stays here.
    Submitting,
    /// A graded result is on screen.
    Reviewing,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Composing => "composing",
            Phase::Blocked { .. } => "blocked",
            Phase::Confirming { .. } => "confirming",
            Phase::Submitting => "submitting",
            Phase::Reviewing => "reviewing",
        }
    }

    fn accepts_answers(&self) -> bool {
        matches!(
            self,
            Phase::Composing | Phase::Blocked { .. } | Phase::Confirming { .. }
        )
    }
}

/// How a confirmed submission ended.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Graded(Arc<GradedResult>),
    /// The draft is intact and the submission may be retried.
    Failed(String),
    /// Teardown fired while the request was outstanding.
    Cancelled,
}

/// One attempt at one assessment.
pub struct AttemptSession {
    session: SessionContext,
    collector: AnswerCollector,
    grading: GradingClient,
    teardown: Teardown,
    phase: Phase,
    last_error: Option<String>,
    result: Option<Arc<GradedResult>>,
}

impl AttemptSession {
    pub fn new(
        assessment: Arc<Assessment>,
        store: DraftStore,
        grading: GradingClient,
        session: SessionContext,
    ) -> Self {
        Self {
            session,
            collector: AnswerCollector::seeded(assessment, store),
            grading,
            teardown: Teardown::new(),
            phase: Phase::Composing,
            last_error: None,
            result: None,
        }
    }

    pub fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = teardown;
        self
    }

    /// Handle that reports and aborts an outstanding submission from elsewhere.
    pub fn teardown_handle(&self) -> Teardown {
        self.teardown.clone()
    }

    pub fn assessment(&self) -> &Arc<Assessment> {
        self.collector.assessment()
    }

    pub fn collector(&self) -> &AnswerCollector {
        &self.collector
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Message from the most recent failed submission, until the next one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn result(&self) -> Option<&Arc<GradedResult>> {
        self.result.as_ref()
    }

    pub fn results_view(&self) -> Option<ResultsView> {
        self.result.as_deref().map(ResultsView::new)
    }

    /// Record an answer. Withdraws a pending confirmation or block.
    pub fn set_answer(&mut self, question_id: &QuestionId, option: usize) -> Result<(), AttemptError> {
        if !self.phase.accepts_answers() {
            return Err(AttemptError::NotComposing(self.phase.label()));
        }
        self.collector.set_answer(question_id, option)?;
        self.phase = Phase::Composing;
        Ok(())
    }

    /// Check completeness. No network call is made.
    pub fn request_submit(&mut self) -> Result<&Phase, AttemptError> {
        if !self.phase.accepts_answers() {
            return Err(AttemptError::NotComposing(self.phase.label()));
        }
        let assessment = self.collector.assessment();
        self.phase = match validate(assessment, self.collector.draft()) {
            Completeness::Incomplete { remaining } => {
                tracing::debug!(remaining = remaining.len(), "submission blocked");
                Phase::Blocked {
                    remaining: remaining.len(),
                }
            }
            Completeness::Complete => Phase::Confirming {
                total: assessment.total_questions,
            },
        };
        Ok(&self.phase)
    }

    /// The user declined the confirmation prompt. Nothing else changes.
    pub fn cancel_submit(&mut self) -> Result<(), AttemptError> {
        match self.phase {
            Phase::Confirming { .. } => {
                self.phase = Phase::Composing;
                Ok(())
            }
            _ => Err(AttemptError::NotConfirming),
        }
    }

    /// The user confirmed. Format, send, and settle the attempt.
    ///
    /// On success the stored draft is cleared and the attempt moves to
    /// `Reviewing`. On failure the draft is left exactly as it was and the
    /// attempt returns to `Composing` with [`last_error`](Self::last_error) set.
    /// After teardown nothing about the attempt is written, whether teardown
    /// came before the call or while it was outstanding.
    #[instrument(skip(self), fields(assessment = %self.collector.assessment().id))]
    pub async fn confirm_submit(&mut self) -> Result<SubmitOutcome, AttemptError> {
        if !matches!(self.phase, Phase::Confirming { .. }) {
            return Err(AttemptError::NotConfirming);
        }
        let Some(submission) =
            format_submission(self.collector.assessment(), self.collector.draft())
        else {
            // Unreachable through this API, but never send a partial answer set.
            self.request_submit()?;
            return Err(AttemptError::NotConfirming);
        };
        if self.teardown.is_torn_down() {
            tracing::debug!("submission refused after teardown");
            return Ok(SubmitOutcome::Cancelled);
        }

        self.phase = Phase::Submitting;
        self.last_error = None;

        let outcome = self
            .teardown
            .run(
                Activity::Submitting,
                self.grading.submit(&self.session, &submission),
            )
            .await;

        match outcome {
            Ok(Ok(result)) => {
                let result = Arc::new(result);
                self.collector.reset();
                self.result = Some(Arc::clone(&result));
                self.phase = Phase::Reviewing;
                Ok(SubmitOutcome::Graded(result))
            }
            Ok(Err(e)) => {
                tracing::warn!("submission failed, draft kept: {e:#}");
                let message = user_message(&e, SUBMIT_FAILED_MESSAGE);
                self.last_error = Some(message.clone());
                self.phase = Phase::Composing;
                Ok(SubmitOutcome::Failed(message))
            }
            Err(_) => {
                tracing::debug!("submission cancelled by teardown, response dropped");
                Ok(SubmitOutcome::Cancelled)
            }
        }
    }

    /// Start a fresh attempt after reviewing a result.
    pub fn retry(&mut self) -> Result<(), AttemptError> {
        if self.phase != Phase::Reviewing {
            return Err(AttemptError::NotReviewing);
        }
        self.result = None;
        self.collector.reset();
        self.last_error = None;
        self.phase = Phase::Composing;
        tracing::debug!(assessment = %self.collector.assessment().id, "starting a new attempt");
        Ok(())
    }

    /// Leave the assessment. In-memory state is dropped; storage is untouched.
    pub fn back(self) {
        tracing::debug!(
            assessment = %self.collector.assessment().id,
            phase = self.phase.label(),
            "leaving assessment"
        );
    }
}

impl Drop for AttemptSession {
    fn drop(&mut self) {
        self.teardown.fire();
    }
}

/// Result of trying to open an attempt.
pub enum OpenOutcome {
    Ready(AttemptSession),
    Failed(String),
    Cancelled,
}

/// Entry point wiring the backend, access gate, and draft storage together.
pub struct Engine {
    backend: Arc<dyn AssessmentBackend>,
    gate: Arc<dyn AccessGate>,
    store: DraftStore,
    session: SessionContext,
}

impl Engine {
    pub fn new(backend: Arc<dyn AssessmentBackend>, store: DraftStore, session: SessionContext) -> Self {
        Self {
            backend,
            gate: Arc::new(OpenGate),
            store,
            session,
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.store
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Load `id` and open an attempt seeded from its stored draft.
    ///
    /// `teardown` covers both the load and every later submission of the
    /// returned attempt.
    pub async fn open(&self, id: &AssessmentId, teardown: Teardown) -> OpenOutcome {
        let mut loader = AssessmentLoader::new(Arc::clone(&self.backend))
            .with_gate(Arc::clone(&self.gate))
            .with_teardown(teardown.clone());

        match loader.load(&self.session, id).await {
            LoadState::Ready(assessment) => OpenOutcome::Ready(
                AttemptSession::new(
                    Arc::clone(assessment),
                    self.store.clone(),
                    GradingClient::new(Arc::clone(&self.backend)),
                    self.session.clone(),
                )
                .with_teardown(teardown),
            ),
            LoadState::Failed(message) => OpenOutcome::Failed(message.clone()),
            LoadState::Idle | LoadState::Loading => OpenOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::fixtures::{graded, sample_assessment, StubBackend};

    fn attempt(backend: Arc<StubBackend>, store: &DraftStore) -> AttemptSession {
        AttemptSession::new(
            Arc::new(sample_assessment("a1", 3)),
            store.clone(),
            GradingClient::new(backend),
            SessionContext::anonymous(),
        )
    }

    fn answer_all(attempt: &mut AttemptSession) {
        for (q, opt) in [("q1", 0), ("q2", 1), ("q3", 2)] {
            attempt.set_answer(&q.into(), opt).unwrap();
        }
    }

    #[tokio::test]
    async fn blocked_then_graded_scenario() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3)).then_submit(Ok(graded(2, 3, 1))),
        );
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend.clone(), &store);

        attempt.set_answer(&"q1".into(), 0).unwrap();
        attempt.set_answer(&"q2".into(), 1).unwrap();
        assert_eq!(
            attempt.request_submit().unwrap(),
            &Phase::Blocked { remaining: 1 }
        );
        assert!(backend.received.lock().unwrap().is_empty());

        attempt.set_answer(&"q3".into(), 2).unwrap();
        assert_eq!(attempt.phase(), &Phase::Composing);
        assert_eq!(
            attempt.request_submit().unwrap(),
            &Phase::Confirming { total: 3 }
        );

        let outcome = attempt.confirm_submit().await.unwrap();
        let SubmitOutcome::Graded(result) = outcome else {
            panic!("expected a graded outcome");
        };
        assert_eq!(result.score, 2);
        assert_eq!(attempt.phase(), &Phase::Reviewing);
        assert!(store.load(&"a1".into()).is_empty());

        let view = attempt.results_view().unwrap();
        assert_eq!(view.score_line(), "2 / 3");
        assert_eq!(view.percentage_line(), "67% Correct");

        let sent = &backend.received.lock().unwrap()[0];
        assert_eq!(sent.answers.len(), 3);
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft_and_allows_resubmit() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3))
                .then_submit(Err(BackendError::Network("connection reset".into()).into()))
                .then_submit(Ok(graded(3, 3, 2))),
        );
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend.clone(), &store);
        answer_all(&mut attempt);
        let before = store.load(&"a1".into());

        attempt.request_submit().unwrap();
        let outcome = attempt.confirm_submit().await.unwrap();
        assert!(matches!(&outcome, SubmitOutcome::Failed(m) if m == SUBMIT_FAILED_MESSAGE));
        assert_eq!(attempt.phase(), &Phase::Composing);
        assert_eq!(attempt.last_error(), Some(SUBMIT_FAILED_MESSAGE));
        assert_eq!(store.load(&"a1".into()).answers(), before.answers());

        // Resubmit without re-answering.
        assert_eq!(
            attempt.request_submit().unwrap(),
            &Phase::Confirming { total: 3 }
        );
        assert!(matches!(
            attempt.confirm_submit().await.unwrap(),
            SubmitOutcome::Graded(_)
        ));
        assert!(attempt.last_error().is_none());
        assert!(store.load(&"a1".into()).is_empty());
        assert_eq!(backend.received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn backend_message_is_surfaced() {
        let backend = Arc::new(StubBackend::serving(sample_assessment("a1", 3)).then_submit(Err(
            BackendError::Rejected {
                status: 409,
                message: Some("Maximum attempts reached".into()),
            }
            .into(),
        )));
        let mut attempt = attempt(backend, &DraftStore::in_memory());
        answer_all(&mut attempt);
        attempt.request_submit().unwrap();
        attempt.confirm_submit().await.unwrap();
        assert_eq!(attempt.last_error(), Some("Maximum attempts reached"));
    }

    #[tokio::test]
    async fn declining_confirmation_has_no_side_effects() {
        let backend = Arc::new(StubBackend::serving(sample_assessment("a1", 3)));
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend.clone(), &store);
        answer_all(&mut attempt);

        attempt.request_submit().unwrap();
        attempt.cancel_submit().unwrap();
        assert_eq!(attempt.phase(), &Phase::Composing);
        assert_eq!(store.load(&"a1".into()).len(), 3);
        assert!(backend.received.lock().unwrap().is_empty());
        assert_eq!(attempt.cancel_submit(), Err(AttemptError::NotConfirming));
        assert!(matches!(
            attempt.confirm_submit().await,
            Err(AttemptError::NotConfirming)
        ));
    }

    #[tokio::test]
    async fn retry_resets_cleanly() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3)).then_submit(Ok(graded(1, 3, 1))),
        );
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend, &store);
        answer_all(&mut attempt);
        attempt.request_submit().unwrap();
        attempt.confirm_submit().await.unwrap();

        assert!(matches!(
            attempt.set_answer(&"q1".into(), 1),
            Err(AttemptError::NotComposing("reviewing"))
        ));

        attempt.retry().unwrap();
        assert!(attempt.result().is_none());
        assert_eq!(attempt.collector().answered_count(), 0);
        assert!(store.load(&"a1".into()).is_empty());
        assert_eq!(attempt.phase(), &Phase::Composing);
        assert_eq!(attempt.retry(), Err(AttemptError::NotReviewing));
    }

    #[tokio::test]
    async fn back_leaves_storage_alone() {
        let backend = Arc::new(StubBackend::serving(sample_assessment("a1", 3)));
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend, &store);
        attempt.set_answer(&"q2".into(), 3).unwrap();
        attempt.back();
        assert_eq!(store.load(&"a1".into()).get(&"q2".into()), Some(3));
    }

    #[tokio::test]
    async fn teardown_cancels_submission_and_keeps_draft() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3)).then_submit(Ok(graded(3, 3, 1))),
        );
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend, &store);
        answer_all(&mut attempt);
        attempt.request_submit().unwrap();

        attempt.teardown_handle().fire();
        assert!(matches!(
            attempt.confirm_submit().await.unwrap(),
            SubmitOutcome::Cancelled
        ));
        assert!(attempt.result().is_none());
        assert_eq!(attempt.phase(), &Phase::Confirming { total: 3 });
        assert_eq!(store.load(&"a1".into()).len(), 3);
    }

    #[tokio::test]
    async fn busy_flag_is_visible_while_submitting() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3))
                .then_submit(Ok(graded(2, 3, 1)))
                .held(),
        );
        let mut attempt = attempt(backend.clone(), &DraftStore::in_memory());
        answer_all(&mut attempt);
        attempt.request_submit().unwrap();
        let handle = attempt.teardown_handle();
        assert_eq!(handle.activity(), None);

        let watch = async {
            while !handle.is_busy() {
                tokio::task::yield_now().await;
            }
            let seen = handle.activity();
            backend.release();
            seen
        };
        let (outcome, seen) = tokio::join!(attempt.confirm_submit(), watch);

        assert_eq!(seen, Some(Activity::Submitting));
        assert!(matches!(outcome.unwrap(), SubmitOutcome::Graded(_)));
        assert_eq!(handle.activity(), None);
        assert_eq!(attempt.phase(), &Phase::Reviewing);
    }

    #[tokio::test]
    async fn teardown_mid_submission_writes_nothing() {
        let backend = Arc::new(
            StubBackend::serving(sample_assessment("a1", 3))
                .then_submit(Ok(graded(3, 3, 1)))
                .held(),
        );
        let store = DraftStore::in_memory();
        let mut attempt = attempt(backend.clone(), &store);
        answer_all(&mut attempt);
        attempt.request_submit().unwrap();
        let handle = attempt.teardown_handle();

        let fire = async {
            while !handle.is_busy() {
                tokio::task::yield_now().await;
            }
            handle.fire();
        };
        let (outcome, ()) = tokio::join!(attempt.confirm_submit(), fire);

        assert!(matches!(outcome.unwrap(), SubmitOutcome::Cancelled));
        assert_eq!(attempt.phase(), &Phase::Submitting);
        assert!(attempt.result().is_none());
        assert!(attempt.last_error().is_none());
        assert_eq!(store.load(&"a1".into()).len(), 3);
        assert!(matches!(
            attempt.set_answer(&"q1".into(), 1),
            Err(AttemptError::NotComposing("submitting"))
        ));
    }

    #[tokio::test]
    async fn engine_opens_with_resumed_draft() {
        let backend: Arc<dyn AssessmentBackend> =
            Arc::new(StubBackend::serving(sample_assessment("a1", 3)));
        let store = DraftStore::in_memory();
        let engine = Engine::new(backend, store.clone(), SessionContext::anonymous());

        let OpenOutcome::Ready(mut first) = engine.open(&"a1".into(), Teardown::new()).await else {
            panic!("expected ready");
        };
        first.set_answer(&"q1".into(), 2).unwrap();
        first.back();

        let OpenOutcome::Ready(second) = engine.open(&"a1".into(), Teardown::new()).await else {
            panic!("expected ready");
        };
        assert_eq!(second.collector().answer(&"q1".into()), Some(2));
        assert_eq!(second.collector().answered_count(), 1);
    }

    #[tokio::test]
    async fn engine_reports_load_failure() {
        let backend: Arc<dyn AssessmentBackend> = Arc::new(StubBackend::failing(
            BackendError::NotFound {
                message: Some("Unknown assessment".into()),
            },
        ));
        let engine = Engine::new(backend, DraftStore::in_memory(), SessionContext::anonymous());
        assert!(matches!(
            engine.open(&"zz".into(), Teardown::new()).await,
            OpenOutcome::Failed(m) if m == "Unknown assessment"
        ));
    }
}
