//! Unified diff parsing and pre-LLM noise filtering.
//!
//! Turns the raw diff text from `git diff` or the GitHub pull-request diff
//! endpoint into per-file structures, then filters out binary files, deleted
//! files, and noise before anything is sent to the model.

pub mod filter;
pub mod parser;
