//! System git backend - zero dependencies
//!
//! Uses git porcelain and plumbing commands for all operations. Every command
//! runs in an isolated environment so user config can't change its output.

use crate::core::error::{GitError, ResultExt, ShipError, ShipResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment variables passed through to git
///
/// Identity and transport settings are supplied by the caller (CI secrets,
/// ssh-agent); everything else is dropped.
const PASSTHROUGH_ENV: &[&str] = &[
  "PATH",
  "HOME",
  "GIT_AUTHOR_NAME",
  "GIT_AUTHOR_EMAIL",
  "GIT_COMMITTER_NAME",
  "GIT_COMMITTER_EMAIL",
  "GIT_SSH_COMMAND",
  "SSH_AUTH_SOCK",
  "GIT_ASKPASS",
];

/// Git backend using system git (zero crate dependencies)
#[derive(Clone)]
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Commit identity override (name, email)
  identity: Option<(String, String)>,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> ShipResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ShipError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(ShipError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
      identity: None,
    })
  }

  /// Commit as this identity instead of whatever git config says
  pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
    self.identity = Some((name.into(), email.into()));
    self
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> ShipResult<String> {
    let output = self.run(&["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Subject line of the HEAD commit
  pub fn head_subject(&self) -> ShipResult<String> {
    let output = self.run(&["log", "-1", "--format=%s", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Get current branch name
  pub fn current_branch(&self) -> ShipResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run a git command and fail on non-zero exit
  pub(crate) fn run(&self, args: &[&str]) -> ShipResult<Output> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ShipError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.to_string(),
      }));
    }

    Ok(output)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables except identity/transport passthrough
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust ambient config)
    cmd.env_clear();
    for key in PASSTHROUGH_ENV {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }
    // Never block a CI job on a credential prompt
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("tag.gpgSign=false");

    if let Some((name, email)) = &self.identity {
      cmd.arg("-c").arg(format!("user.name={}", name));
      cmd.arg("-c").arg(format!("user.email={}", email));
    }

    cmd
  }
}
