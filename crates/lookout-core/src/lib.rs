//! Core types, configuration, and error handling for the Lookout runner.
//!
//! This crate provides the shared foundation used by the other Lookout crates:
//! - [`LookoutError`] — unified error type using `thiserror`
//! - [`LookoutConfig`] — configuration loaded from `.lookout.toml`
//! - [`CiContext`] — the pull-request context resolved from the CI environment
//! - Shared types: [`DiffHunk`], [`Severity`], [`ReviewComment`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{CiContext, LlmConfig, LookoutConfig, ReviewConfig};
pub use error::LookoutError;
pub use types::{ChangeType, DiffHunk, OutputFormat, ReviewComment, Severity};

/// A convenience `Result` type for Lookout operations.
pub type Result<T> = std::result::Result<T, LookoutError>;
