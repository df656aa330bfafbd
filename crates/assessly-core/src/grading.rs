//! Grading client: one request, one scored result.

use std::sync::Arc;

use anyhow::Result;
use tracing::instrument;

use crate::error::BackendError;
use crate::model::{GradedResult, Submission};
use crate::session::SessionContext;
use crate::traits::AssessmentBackend;

/// Sends complete submissions to the grader.
///
/// Never retries on its own: every failure goes back to the caller, who
/// decides whether to resubmit. No idempotency key is attached, so two
/// submissions may record two attempts.
#[derive(Clone)]
pub struct GradingClient {
    backend: Arc<dyn AssessmentBackend>,
}

impl GradingClient {
    pub fn new(backend: Arc<dyn AssessmentBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip_all, fields(assessment = %submission.assessment_id, answers = submission.answers.len()))]
    pub async fn submit(
        &self,
        session: &SessionContext,
        submission: &Submission,
    ) -> Result<GradedResult> {
        let result = self.backend.submit_assessment(session, submission).await?;
        check_shape(&result, submission.answers.len())?;

        tracing::info!(
            score = result.score,
            total = result.total,
            attempt = result.attempt_number,
            "submission graded"
        );
        Ok(result)
    }
}

/// A graded result must cover exactly the questions that were submitted.
fn check_shape(result: &GradedResult, submitted: usize) -> Result<(), BackendError> {
    let problem = if result.score > result.total {
        format!("score {} exceeds total {}", result.score, result.total)
    } else if result.total as usize != submitted {
        format!("total {} but {submitted} answers were submitted", result.total)
    } else if result.results.len() != submitted {
        format!(
            "{} question outcomes for {submitted} submitted answers",
            result.results.len()
        )
    } else {
        return Ok(());
    };
    tracing::warn!("rejecting graded result: {problem}");
    Err(BackendError::InvalidResponse(problem))
}
