//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// ship.toml that keeps runs fast and offline: one attempt, no backoff, and a
/// registry name no cargo config defines
pub const OFFLINE_CONFIG: &str = r#"
[registry]
name = "ship-test-offline"

[retry]
max_attempts = 1
initial_backoff_ms = 0
max_backoff_ms = 0

[identity]
name = "Release Bot"
email = "release-bot@example.com"
"#;

/// A single-crate repository with git history
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repository with a `lib-a` package at `version` and one commit
  pub fn new(version: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(
      path.join("Cargo.toml"),
      format!(
        r#"[package]
name = "lib-a"
# managed by cargo ship
version = "{}"
edition = "2021"
license = "MIT"
description = "A test crate"
"#,
        version
      ),
    )?;
    std::fs::create_dir_all(path.join("src"))?;
    std::fs::write(path.join("src/lib.rs"), "pub fn hello() -> &'static str {\n  \"hello\"\n}\n")?;
    std::fs::write(path.join("ship.toml"), OFFLINE_CONFIG)?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "feat: initial"])?;

    Ok(Self { _root: root, path })
  }

  /// Commit all current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  /// Create an annotated tag on HEAD
  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", "-a", name, "-m", name])?;
    Ok(())
  }

  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn commit_count(&self) -> Result<usize> {
    let output = git(&self.path, &["rev-list", "--count", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().parse()?)
  }

  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "--list"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// Add a bare repository as `origin`
  pub fn add_bare_remote(&self) -> Result<TempDir> {
    let remote = TempDir::new()?;
    git(remote.path(), &["init", "--bare"])?;
    let url = remote.path().to_string_lossy().to_string();
    git(&self.path, &["remote", "add", "origin", &url])?;
    Ok(remote)
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Write a file
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(path), content)?;
    Ok(())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run cargo-ship and return its output whatever the exit status
pub fn run_cargo_ship(cwd: &Path, args: &[&str]) -> Result<Output> {
  let cargo_ship_bin = env!("CARGO_BIN_EXE_cargo-ship");

  Command::new(cargo_ship_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("CARGO_SHIP_LOG")
    .output()
    .context("Failed to run cargo-ship")
}

/// Run cargo-ship and fail unless it exits zero
pub fn run_cargo_ship_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_cargo_ship(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cargo-ship command failed: cargo {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Parse stdout as JSON
pub fn stdout_json(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout).context("stdout is not valid JSON")
}
