//! Local persistence of in-progress answers.
//!
//! Drafts are addressed by a typed [`DraftKey`] and written through a
//! swappable [`DraftBackend`]. The [`DraftStore`] façade in front of it
//! never fails: storage problems are logged and degrade to an empty draft
//! or a skipped write, so answers keep working in memory for the session.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DraftError;
use crate::model::{AssessmentId, QuestionId};

/// What a stored entry is for. Only drafts exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftPurpose {
    Draft,
}

impl DraftPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftPurpose::Draft => "draft",
        }
    }
}

/// Storage key: assessment identity plus purpose tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub assessment_id: AssessmentId,
    pub purpose: DraftPurpose,
}

impl DraftKey {
    pub fn draft(assessment_id: &AssessmentId) -> Self {
        Self {
            assessment_id: assessment_id.clone(),
            purpose: DraftPurpose::Draft,
        }
    }

    /// A file-name-safe rendering of the key, e.g. `intro-101.draft`.
    ///
    /// Bytes outside `[A-Za-z0-9_-]` are percent-encoded so distinct ids
    /// never collide.
    pub fn storage_name(&self) -> String {
        let mut name = String::new();
        for byte in self.assessment_id.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push('.');
        name.push_str(self.purpose.as_str());
        name
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.assessment_id, self.purpose.as_str())
    }
}

/// In-memory draft: question → selected option index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    answers: BTreeMap<QuestionId, usize>,
    revision: u64,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &QuestionId) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    /// Record an answer, returning the one it replaced.
    pub fn set(&mut self, question_id: QuestionId, option: usize) -> Option<usize> {
        self.answers.insert(question_id, option)
    }

    pub fn remove(&mut self, question_id: &QuestionId) -> Option<usize> {
        self.answers.remove(question_id)
    }

    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.answers.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, usize)> {
        self.answers.iter().map(|(k, v)| (k, *v))
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, usize> {
        &self.answers
    }

    /// Revision of the stored copy this draft was last loaded from or saved as.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// The persisted form of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDraft {
    pub answers: BTreeMap<QuestionId, usize>,
    /// Increases by one on every save, across all writers.
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

/// Key-value storage the draft store writes through.
pub trait DraftBackend: Send + Sync {
    fn read(&self, key: &DraftKey) -> Result<Option<StoredDraft>, DraftError>;
    fn write(&self, key: &DraftKey, draft: &StoredDraft) -> Result<(), DraftError>;
    /// Deleting a missing entry is not an error.
    fn delete(&self, key: &DraftKey) -> Result<(), DraftError>;
}

/// Process-local storage. Drafts do not survive a restart.
#[derive(Default)]
pub struct MemoryDraftBackend {
    entries: Mutex<HashMap<DraftKey, StoredDraft>>,
}

impl MemoryDraftBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<DraftKey, StoredDraft>>, DraftError> {
        self.entries
            .lock()
            .map_err(|_| DraftError::Unavailable("memory store lock poisoned".into()))
    }
}

impl DraftBackend for MemoryDraftBackend {
    fn read(&self, key: &DraftKey) -> Result<Option<StoredDraft>, DraftError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn write(&self, key: &DraftKey, draft: &StoredDraft) -> Result<(), DraftError> {
        self.entries()?.insert(key.clone(), draft.clone());
        Ok(())
    }

    fn delete(&self, key: &DraftKey) -> Result<(), DraftError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory.
pub struct FileDraftBackend {
    dir: PathBuf,
}

impl FileDraftBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &DraftKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.storage_name()))
    }
}

impl DraftBackend for FileDraftBackend {
    fn read(&self, key: &DraftKey) -> Result<Option<StoredDraft>, DraftError> {
        let content = match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&self, key: &DraftKey, draft: &StoredDraft) -> Result<(), DraftError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(draft)?)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &DraftKey) -> Result<(), DraftError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The sole writer of persisted drafts.
#[derive(Clone)]
pub struct DraftStore {
    backend: Arc<dyn DraftBackend>,
}

impl DraftStore {
    pub fn new(backend: Arc<dyn DraftBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryDraftBackend::new()))
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileDraftBackend::new(dir)))
    }

    /// Load the draft for an assessment. Missing or unreadable → empty.
    pub fn load(&self, assessment_id: &AssessmentId) -> Draft {
        let key = DraftKey::draft(assessment_id);
        match self.backend.read(&key) {
            Ok(Some(stored)) => {
                tracing::debug!(%key, answers = stored.answers.len(), "loaded draft");
                Draft {
                    answers: stored.answers,
                    revision: stored.revision,
                }
            }
            Ok(None) => Draft::new(),
            Err(e) => {
                tracing::warn!(%key, "could not load draft, starting empty: {e}");
                Draft::new()
            }
        }
    }

    /// Persist `draft`, bumping its revision on success.
    ///
    /// Concurrent writers are last-write-wins; a newer stored revision than
    /// the one `draft` was based on is logged before it is overwritten.
    pub fn save(&self, assessment_id: &AssessmentId, draft: &mut Draft) {
        let key = DraftKey::draft(assessment_id);
        let stored_revision = match self.backend.read(&key) {
            Ok(Some(stored)) => stored.revision,
            Ok(None) => 0,
            Err(e) => {
                tracing::debug!(%key, "existing draft unreadable, overwriting: {e}");
                0
            }
        };
        if stored_revision > draft.revision {
            tracing::warn!(
                %key,
                stored_revision,
                local_revision = draft.revision,
                "draft was changed elsewhere; overwriting with local answers"
            );
        }

        let revision = stored_revision.max(draft.revision) + 1;
        let stored = StoredDraft {
            answers: draft.answers.clone(),
            revision,
            updated_at: Utc::now(),
        };
        match self.backend.write(&key, &stored) {
            Ok(()) => draft.revision = revision,
            Err(e) => tracing::warn!(%key, "could not save draft, answers kept in memory: {e}"),
        }
    }

    /// Remove the stored draft for an assessment.
    pub fn clear(&self, assessment_id: &AssessmentId) {
        let key = DraftKey::draft(assessment_id);
        if let Err(e) = self.backend.delete(&key) {
            tracing::warn!(%key, "could not clear draft: {e}");
        } else {
            tracing::debug!(%key, "cleared draft");
        }
    }

    /// The stored record with its metadata, for inspection tools.
    pub fn inspect(&self, assessment_id: &AssessmentId) -> Result<Option<StoredDraft>, DraftError> {
        self.backend.read(&DraftKey::draft(assessment_id))
    }
}
