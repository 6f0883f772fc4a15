//! Git operations via the system git binary

pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;
