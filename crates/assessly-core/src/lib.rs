//! assessly-core — The assessment-taking engine.
//!
//! This crate defines the data model, the backend boundary traits, local
//! draft persistence, and the attempt state machine that loads an
//! assessment, collects answers, submits them for grading, and renders
//! the scored review.

pub mod collector;
pub mod draft;
pub mod engine;
pub mod error;
pub mod grading;
pub mod loader;
pub mod model;
pub mod results;
pub mod session;
pub mod submission;
pub mod task;
pub mod traits;

#[cfg(test)]
mod fixtures;
