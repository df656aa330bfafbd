//! REST implementation of the assessment backend and access gate.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::instrument;

use assessly_core::error::BackendError;
use assessly_core::model::{Assessment, AssessmentId, GradedResult, Submission};
use assessly_core::session::SessionContext;
use assessly_core::traits::{AccessGate, AssessmentBackend};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Talks to the assessment REST API.
///
/// - `GET  {base}/assessments/{id}`
/// - `POST {base}/assessments/{id}/submit`
/// - `GET  {base}/assessments/{id}/access`
pub struct HttpBackend {
    base_url: Url,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base URL: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "API base URL cannot have paths appended: {base_url}"
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            timeout_secs,
            client,
        })
    }

    fn url(&self, id: &AssessmentId, action: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("assessments").push(id.as_str());
            if let Some(action) = action {
                segments.push(action);
            }
        }
        url
    }

    fn authorized(&self, req: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        match session.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Network(e.to_string())
            }
        })?;
        check_status(response).await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct AccessBody {
    allowed: bool,
}

/// Turn a non-success response into a `BackendError`, keeping its `message`.
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message);
    tracing::debug!(status = status.as_u16(), %body, "backend returned error");

    Err(match status.as_u16() {
        401 | 403 => BackendError::Unauthorized { message },
        404 => BackendError::NotFound { message },
        code => BackendError::Rejected {
            status: code,
            message,
        },
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::InvalidResponse(format!("failed to parse response: {e}")))
}

#[async_trait]
impl AssessmentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, session), fields(assessment = %id))]
    async fn fetch_assessment(
        &self,
        session: &SessionContext,
        id: &AssessmentId,
    ) -> anyhow::Result<Assessment> {
        let req = self.authorized(self.client.get(self.url(id, None)), session);
        let response = self.send(req).await?;
        Ok(parse_json(response).await?)
    }

    #[instrument(skip(self, session, submission), fields(assessment = %submission.assessment_id))]
    async fn submit_assessment(
        &self,
        session: &SessionContext,
        submission: &Submission,
    ) -> anyhow::Result<GradedResult> {
        let req = self
            .client
            .post(self.url(&submission.assessment_id, Some("submit")))
            .json(submission);
        let response = self.send(self.authorized(req, session)).await?;
        Ok(parse_json(response).await?)
    }
}

#[async_trait]
impl AccessGate for HttpBackend {
    #[instrument(skip(self, session), fields(assessment = %id))]
    async fn is_allowed(
        &self,
        session: &SessionContext,
        id: &AssessmentId,
    ) -> anyhow::Result<bool> {
        let req = self.authorized(self.client.get(self.url(id, Some("access"))), session);
        match self.send(req).await {
            Ok(response) => Ok(parse_json::<AccessBody>(response).await?.allowed),
            Err(BackendError::Unauthorized { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
