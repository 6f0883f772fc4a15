//! Core building blocks shared by every command
//!
//! - **config**: ship.toml parsing and validation
//! - **context**: Release context resolved once per invocation
//! - **error**: Error types with contextual help messages and exit codes
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
