//! Assessment loading.
//!
//! `idle → loading → {ready | failed}`. A failed load carries a message fit
//! for display; a ready load carries a shape-checked assessment whose
//! declared count has been reconciled with its question list. While the
//! fetch is outstanding the loader's [`Teardown`] reports
//! [`Activity::Loading`].

use std::sync::Arc;

use tracing::instrument;

use crate::error::user_message;
use crate::model::{Assessment, AssessmentId};
use crate::session::SessionContext;
use crate::task::{Activity, Teardown};
use crate::traits::{AccessGate, AssessmentBackend, OpenGate};

/// Shown when the backend gives no message of its own.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load assessment. Please try again.";
/// Shown when the access gate denies the assessment.
pub const ACCESS_DENIED_MESSAGE: &str = "You do not have access to this assessment.";

/// Where a load currently stands.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready(Arc<Assessment>),
    Failed(String),
}

impl LoadState {
    pub fn assessment(&self) -> Option<&Arc<Assessment>> {
        match self {
            LoadState::Ready(a) => Some(a),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Fetches one assessment definition and tracks the load state.
pub struct AssessmentLoader {
    backend: Arc<dyn AssessmentBackend>,
    gate: Arc<dyn AccessGate>,
    teardown: Teardown,
    state: LoadState,
}

impl AssessmentLoader {
    pub fn new(backend: Arc<dyn AssessmentBackend>) -> Self {
        Self {
            backend,
            gate: Arc::new(OpenGate),
            teardown: Teardown::new(),
            state: LoadState::Idle,
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Load `id`, leaving the loader in `Ready` or `Failed`.
    ///
    /// A torn-down loader is never written to again: a load requested after
    /// teardown leaves the state untouched, and a response that arrives
    /// after teardown is dropped with the state left at `Loading`.
    #[instrument(skip(self, session), fields(backend = self.backend.name(), session = %session.session_id()))]
    pub async fn load(&mut self, session: &SessionContext, id: &AssessmentId) -> &LoadState {
        if self.teardown.is_torn_down() {
            tracing::debug!("load refused after teardown");
            return &self.state;
        }
        self.state = LoadState::Loading;

        let outcome = self
            .teardown
            .run(
                Activity::Loading,
                fetch_checked(&*self.backend, &*self.gate, session, id),
            )
            .await;

        match outcome {
            Ok(Ok(assessment)) => self.state = LoadState::Ready(Arc::new(assessment)),
            Ok(Err(message)) => self.state = LoadState::Failed(message),
            Err(_) => tracing::debug!("load cancelled, response dropped"),
        }
        &self.state
    }
}

async fn fetch_checked(
    backend: &dyn AssessmentBackend,
    gate: &dyn AccessGate,
    session: &SessionContext,
    id: &AssessmentId,
) -> Result<Assessment, String> {
    match gate.is_allowed(session, id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(assessment = %id, "access denied");
            return Err(ACCESS_DENIED_MESSAGE.to_string());
        }
        Err(e) => {
            tracing::warn!(assessment = %id, "access check failed: {e:#}");
            return Err(user_message(&e, LOAD_FAILED_MESSAGE));
        }
    }

    let mut assessment = backend.fetch_assessment(session, id).await.map_err(|e| {
        tracing::warn!(assessment = %id, "failed to load assessment: {e:#}");
        user_message(&e, LOAD_FAILED_MESSAGE)
    })?;

    if let Err(problem) = assessment.validate_shape() {
        tracing::warn!(assessment = %id, "rejecting malformed assessment: {problem}");
        return Err(LOAD_FAILED_MESSAGE.to_string());
    }

    if !assessment.is_count_consistent() {
        tracing::warn!(
            assessment = %id,
            declared = assessment.total_questions,
            actual = assessment.question_count(),
            "declared question count does not match questions; using actual count"
        );
        assessment.total_questions = assessment.question_count();
    }

    tracing::info!(
        assessment = %id,
        questions = assessment.total_questions,
        "assessment loaded"
    );
    Ok(assessment)
}
