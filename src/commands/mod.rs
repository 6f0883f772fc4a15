//! CLI commands for cargo-ship
//!
//! - **plan**: Compute and show the next version for a channel (read-only)
//! - **run**: Execute (or dry-run) a release through commit, tag, push, build, publish
//!
//! All commands accept `&ReleaseContext` to avoid redundant repository loads.

pub mod plan;
pub mod run;

pub use plan::run_plan;
pub use run::run_release;
