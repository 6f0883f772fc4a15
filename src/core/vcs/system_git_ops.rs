//! Release operations for SystemGit (tags, release commits, remotes)

use super::system_git::SystemGit;
use crate::core::error::{GitError, ReleaseErrorKind, ResultExt, ShipError, ShipResult};
use std::path::Path;

impl SystemGit {
  /// List all tag names
  pub fn list_tags(&self) -> ShipResult<Vec<String>> {
    let output = self.run(&["tag", "--list"])?;

    let tags = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();

    Ok(tags)
  }

  /// Check if a tag exists locally
  pub fn tag_exists(&self, tag: &str) -> ShipResult<bool> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &format!("refs/tags/{}", tag)])
      .output()
      .context("Failed to look up tag")?;

    Ok(output.status.success())
  }

  /// Commit SHA a tag points to (peels annotated tags)
  pub fn tag_target(&self, tag: &str) -> ShipResult<String> {
    let output = self.run(&["rev-list", "-n", "1", &format!("refs/tags/{}", tag)])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create an annotated tag on a commit
  pub fn create_annotated_tag(&self, tag: &str, message: &str, commit: &str) -> ShipResult<()> {
    let output = self
      .git_cmd()
      .args(["tag", "-a", tag, "-m", message, commit])
      .output()
      .context("Failed to run git tag")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("already exists") {
        return Err(ShipError::release(
          ReleaseErrorKind::TagAlreadyExists,
          format!("tag {} already exists", tag),
        ));
      }
      return Err(ShipError::Git(GitError::CommandFailed {
        command: format!("git tag -a {}", tag),
        stderr: stderr.to_string(),
      }));
    }

    Ok(())
  }

  /// Full commit messages since a revision (newest first)
  ///
  /// An unborn HEAD has no history and yields an empty list.
  pub fn commit_messages_since(&self, since: Option<&str>) -> ShipResult<Vec<String>> {
    let mut args = vec!["log".to_string(), "--format=%B%x00".to_string()];
    match since {
      Some(rev) => args.push(format!("{}..HEAD", rev)),
      None => args.push("HEAD".to_string()),
    }

    let output = self.git_cmd().args(&args).output().context("Failed to run git log")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("does not have any commits") || (stderr.contains("unknown revision") && since.is_none()) {
        return Ok(Vec::new());
      }
      return Err(ShipError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.to_string(),
      }));
    }

    let messages = String::from_utf8_lossy(&output.stdout)
      .split('\0')
      .map(|m| m.trim().to_string())
      .filter(|m| !m.is_empty())
      .collect();

    Ok(messages)
  }

  /// Whether a path is tracked by git
  pub fn is_tracked(&self, path: &Path) -> ShipResult<bool> {
    let output = self
      .git_cmd()
      .arg("ls-files")
      .arg("--error-unmatch")
      .arg(path)
      .output()
      .context("Failed to run git ls-files")?;

    Ok(output.status.success())
  }

  /// Commit exactly these paths and return the new HEAD
  pub fn commit_paths(&self, paths: &[&Path], message: &str) -> ShipResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["commit", "-m", message, "--"]);
    for path in paths {
      cmd.arg(path);
    }

    let output = cmd.output().context("Failed to run git commit")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ShipError::Git(GitError::CommandFailed {
        command: "git commit".to_string(),
        stderr: if stderr.trim().is_empty() {
          String::from_utf8_lossy(&output.stdout).to_string()
        } else {
          stderr.to_string()
        },
      }));
    }

    self.head_commit()
  }

  /// Check whether the remote already has a tag
  pub fn remote_has_tag(&self, remote: &str, tag: &str) -> ShipResult<bool> {
    let refname = format!("refs/tags/{}", tag);
    let output = self
      .git_cmd()
      .args(["ls-remote", "--tags", remote, &refname])
      .output()
      .context("Failed to run git ls-remote")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let kind = classify_remote_failure(&stderr, ReleaseErrorKind::NetworkTransient);
      return Err(ShipError::release(
        kind,
        format!("git ls-remote {} failed: {}", remote, stderr.trim()),
      ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().any(|line| line.split_whitespace().nth(1) == Some(refname.as_str())))
  }

  /// Push the release commit to a branch and the tag, atomically
  pub fn push_release(&self, remote: &str, commit: &str, branch: &str, tag: &str) -> ShipResult<()> {
    let branch_spec = format!("{}:refs/heads/{}", commit, branch);
    let tag_spec = format!("refs/tags/{}", tag);

    let output = self
      .git_cmd()
      .args(["push", "--atomic", remote, &branch_spec, &tag_spec])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let kind = classify_remote_failure(&stderr, ReleaseErrorKind::PushRejected);
      return Err(ShipError::release(
        kind,
        format!("push of {} and {} to {} failed: {}", branch, tag, remote, stderr.trim()),
      ));
    }

    Ok(())
  }
}

/// Classify a failed remote operation from git's stderr
///
/// Misconfiguration is fatal, connectivity problems are transient, anything
/// else gets `fallback`.
pub fn classify_remote_failure(stderr: &str, fallback: ReleaseErrorKind) -> ReleaseErrorKind {
  const MISCONFIGURED: &[&str] = &[
    "does not appear to be a git repository",
    "No such remote",
    "repository not found",
    "Repository not found",
  ];
  const TRANSIENT: &[&str] = &[
    "Could not resolve host",
    "timed out",
    "Connection reset",
    "Connection refused",
    "early EOF",
    "The remote end hung up",
    "RPC failed",
    "Temporary failure",
    "unable to access",
    "HTTP 502",
    "HTTP 503",
    "HTTP 504",
  ];

  if MISCONFIGURED.iter().any(|m| stderr.contains(m)) {
    ReleaseErrorKind::CommandFailed
  } else if TRANSIENT.iter().any(|m| stderr.contains(m)) {
    ReleaseErrorKind::NetworkTransient
  } else {
    fallback
  }
}
