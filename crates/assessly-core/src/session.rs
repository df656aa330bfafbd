//! Explicit session context.
//!
//! Built once at process start and handed to every service that needs the
//! caller's identity or credential. Nothing in the engine reads ambient
//! auth state.

use uuid::Uuid;

/// Who is taking the assessment and how to authenticate as them.
#[derive(Clone)]
pub struct SessionContext {
    session_id: Uuid,
    user_id: Option<String>,
    bearer_token: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: Option<String>, bearer_token: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
        }
    }

    /// A session with no user and no credential.
    pub fn anonymous() -> Self {
        Self::new(None, None)
    }

    /// Identifier for correlating log lines of one process run.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Opaque credential attached to every backend request.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}
