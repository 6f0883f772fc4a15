//! Release planning and execution
//!
//! # Core Invariants
//!
//! 1. **Planning is read-only**
//!    - The next version is a pure function of tags, manifest and commits
//!    - Planning twice without new tags yields the same version
//!
//! 2. **Execution is resumable**
//!    - Every transition checks whether its effect already exists
//!    - Re-running after a failure never duplicates a commit, tag or upload
//!
//! 3. **Failures are classified**
//!    - Transient network failures and push rejections are retried with backoff
//!    - A registry refusal is final and surfaced with its reason
//!
//! # Architecture
//!
//! - **version**: channels, bump policies, tag naming
//! - **plan**: `RepositoryState` snapshot and the planner
//! - **executor**: the commit → tag → push → build → publish state machine
//! - **traits**: collaborators the executor drives
//! - **git_repository**: the git + manifest collaborator
//! - **record**: what a run did
//! - **retry**: bounded exponential backoff

pub mod executor;
pub mod git_repository;
pub mod plan;
pub mod record;
pub mod retry;
pub mod traits;
pub mod version;
