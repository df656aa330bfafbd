//! Boundary traits for the external collaborators.
//!
//! The assessment backend and the enrollment/access check are implemented
//! by `assessly-client`. Errors are returned as `anyhow::Error`; callers
//! downcast to [`BackendError`](crate::error::BackendError) when they need
//! the backend's message.

use async_trait::async_trait;

use crate::model::{Assessment, AssessmentId, GradedResult, Submission};
use crate::session::SessionContext;

/// The remote service that stores assessment definitions and grades submissions.
#[async_trait]
pub trait AssessmentBackend: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch an assessment definition.
    async fn fetch_assessment(
        &self,
        session: &SessionContext,
        id: &AssessmentId,
    ) -> anyhow::Result<Assessment>;

    /// Grade a complete submission. Each call may record a new attempt.
    async fn submit_assessment(
        &self,
        session: &SessionContext,
        submission: &Submission,
    ) -> anyhow::Result<GradedResult>;
}

/// Enrollment/access check consulted before an assessment is reachable.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn is_allowed(&self, session: &SessionContext, id: &AssessmentId)
        -> anyhow::Result<bool>;
}

/// An access gate that lets everyone through.
pub struct OpenGate;

#[async_trait]
impl AccessGate for OpenGate {
    async fn is_allowed(&self, _: &SessionContext, _: &AssessmentId) -> anyhow::Result<bool> {
        Ok(true)
    }
}
