//! Client configuration and factories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assessly_core::draft::DraftStore;
use assessly_core::session::SessionContext;

use crate::http::{HttpBackend, DEFAULT_TIMEOUT_SECS};

/// Connection settings for the assessment API.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Ask the enrollment endpoint before loading an assessment.
    #[serde(default = "default_true")]
    pub check_access: bool,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("check_access", &self.check_access)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
            check_access: true,
        }
    }
}

/// Where drafts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStorage {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    #[serde(default = "default_storage")]
    pub storage: DraftStorage,
    #[serde(default = "default_draft_dir")]
    pub dir: PathBuf,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            dir: default_draft_dir(),
        }
    }
}

/// Top-level assessly configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssesslyConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub drafts: DraftConfig,
    /// Reported user, for logging only.
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_true() -> bool {
    true
}
fn default_storage() -> DraftStorage {
    DraftStorage::File
}
fn default_draft_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("assessly")
                .join("drafts")
        })
        .unwrap_or_else(|_| PathBuf::from(".assessly-drafts"))
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied as-is and never scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessly.toml` in the current directory
/// 2. `~/.config/assessly/config.toml`
///
/// Environment variable overrides: `ASSESSLY_API_URL`, `ASSESSLY_API_TOKEN`,
/// `ASSESSLY_DRAFT_DIR`.
pub fn load_config() -> Result<AssesslyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssesslyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessly.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AssesslyConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AssesslyConfig::default(),
    };

    config.api.base_url = resolve_env_vars(&config.api.base_url);
    config.api.token = config
        .api
        .token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
    config.drafts.dir = PathBuf::from(resolve_env_vars(&config.drafts.dir.to_string_lossy()));

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Environment overrides are taken literally, after file interpolation.
fn apply_env_overrides(config: &mut AssesslyConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("ASSESSLY_API_URL") {
        config.api.base_url = url;
    }
    if let Some(token) = lookup("ASSESSLY_API_TOKEN") {
        config.api.token = Some(token).filter(|t| !t.is_empty());
    }
    if let Some(dir) = lookup("ASSESSLY_DRAFT_DIR") {
        config.drafts.dir = PathBuf::from(dir);
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessly"))
}

/// Build the HTTP backend described by `config`.
pub fn create_backend(config: &AssesslyConfig) -> Result<Arc<HttpBackend>> {
    Ok(Arc::new(HttpBackend::new(
        &config.api.base_url,
        config.api.timeout_secs,
    )?))
}

/// Build the draft store described by `config`.
pub fn create_draft_store(config: &AssesslyConfig) -> DraftStore {
    match config.drafts.storage {
        DraftStorage::File => DraftStore::on_disk(&config.drafts.dir),
        DraftStorage::Memory => DraftStore::in_memory(),
    }
}

/// Build the session context once, at startup.
pub fn create_session(config: &AssesslyConfig) -> SessionContext {
    SessionContext::new(config.user_id.clone(), config.api.token.clone())
}
