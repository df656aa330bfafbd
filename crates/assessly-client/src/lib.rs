//! assessly-client — Backend integrations.
//!
//! Implements the `AssessmentBackend` and `AccessGate` traits over the
//! assessment REST API, loads client configuration, and provides an
//! in-process mock backend for tests and offline runs.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{
    create_backend, create_draft_store, create_session, load_config, load_config_from,
    AssesslyConfig,
};
pub use http::HttpBackend;
pub use mock::MockBackend;
