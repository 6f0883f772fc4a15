//! Integration tests for `cargo ship run`
//!
//! Runs stop before touching a real registry: either the push fails (no
//! remote) or the registry lookup fails (unknown registry name).

use crate::helpers::{TestRepo, git, run_cargo_ship, run_cargo_ship_ok, stdout_json};
use anyhow::Result;

#[test]
fn test_run_commits_and_tags_then_stops_at_push() -> Result<()> {
  let repo = TestRepo::new("0.1.0")?;

  let output = run_cargo_ship(&repo.path, &["ship", "run", "--channel", "beta", "--json"])?;
  assert_eq!(output.status.code(), Some(2));

  let record = stdout_json(&output)?;
  assert_eq!(record["version"], "0.1.0-beta.1");
  assert_eq!(record["reached"], "tagged");
  assert_eq!(record["failure"]["transition"], "push");
  assert_eq!(record["failure"]["kind"], "command-failed");
  assert_eq!(record["publish_status"]["state"], "failed");

  assert_eq!(repo.tags()?, vec!["v0.1.0-beta.1".to_string()]);
  assert_eq!(repo.commit_count()?, 2);

  let manifest = repo.read_file("Cargo.toml")?;
  assert!(manifest.contains("version = \"0.1.0-beta.1\""));
  assert!(manifest.contains("# managed by cargo ship"));

  let subject = git(&repo.path, &["log", "-1", "--format=%s|%an"])?;
  assert_eq!(
    String::from_utf8_lossy(&subject.stdout).trim(),
    "chore(release): v0.1.0-beta.1|Release Bot"
  );
  Ok(())
}

#[test]
fn test_rerun_after_tag_does_not_duplicate() -> Result<()> {
  let repo = TestRepo::new("0.1.0")?;

  run_cargo_ship(&repo.path, &["ship", "run", "--channel", "beta"])?;
  let head = repo.head()?;

  let output = run_cargo_ship(
    &repo.path,
    &["ship", "run", "--channel", "beta", "--version", "0.1.0-beta.1", "--json"],
  )?;
  assert_eq!(output.status.code(), Some(2));

  let record = stdout_json(&output)?;
  assert_eq!(record["steps"][0]["transition"], "commit");
  assert_eq!(record["steps"][0]["outcome"], "skipped");
  assert_eq!(record["steps"][1]["transition"], "tag");
  assert_eq!(record["steps"][1]["outcome"], "skipped");
  assert_eq!(record["commit"], head.as_str());
  assert_eq!(record["failure"]["transition"], "push");

  assert_eq!(repo.head()?, head);
  assert_eq!(repo.commit_count()?, 2);
  assert_eq!(repo.tags()?, vec!["v0.1.0-beta.1".to_string()]);
  Ok(())
}

#[test]
fn test_failure_message_explains_how_to_resume() -> Result<()> {
  let repo = TestRepo::new("0.1.0")?;

  let output = run_cargo_ship(&repo.path, &["ship", "run", "--channel", "beta"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(stderr.contains("Release stopped at 'push'"), "stderr: {}", stderr);
  assert!(stderr.contains("reached: tagged"), "stderr: {}", stderr);
  assert!(
    stderr.contains("cargo ship run --channel beta --version 0.1.0-beta.1"),
    "stderr: {}",
    stderr
  );
  Ok(())
}

#[test]
fn test_run_pushes_commit_and_tag_to_remote() -> Result<()> {
  let repo = TestRepo::new("0.3.0")?;
  let remote = repo.add_bare_remote()?;

  let output = run_cargo_ship(
    &repo.path,
    &["ship", "run", "--channel", "release", "--version", "0.3.0", "--json"],
  )?;
  // No registry named ship-test-offline exists, so the run stops at build
  assert_eq!(output.status.code(), Some(2));

  let record = stdout_json(&output)?;
  assert_eq!(record["reached"], "pushed");
  assert_eq!(record["publish_status"]["state"], "failed");
  assert_eq!(record["failure"]["transition"], "build");
  // Manifest already declared 0.3.0, so no release commit was needed
  assert_eq!(record["steps"][0]["outcome"], "skipped");
  assert_eq!(repo.commit_count()?, 1);

  let remote_tags = git(remote.path(), &["tag", "--list"])?;
  assert_eq!(String::from_utf8_lossy(&remote_tags.stdout).trim(), "v0.3.0");
  let remote_head = git(remote.path(), &["rev-parse", "refs/heads/main"])?;
  assert_eq!(String::from_utf8_lossy(&remote_head.stdout).trim(), repo.head()?);
  Ok(())
}

#[test]
fn test_resume_refuses_to_package_commits_after_the_tag() -> Result<()> {
  let repo = TestRepo::new("0.3.0")?;
  let _remote = repo.add_bare_remote()?;

  let args = ["ship", "run", "--channel", "release", "--version", "0.3.0", "--json"];
  let first = stdout_json(&run_cargo_ship(&repo.path, &args)?)?;
  assert_eq!(first["reached"], "pushed");
  let release_commit = repo.head()?;

  repo.write_file("src/lib.rs", "pub fn unreleased() {}\n")?;
  let moved_head = repo.commit("feat: unreleased work")?;

  let output = run_cargo_ship(&repo.path, &args)?;
  assert_eq!(output.status.code(), Some(2));

  let record = stdout_json(&output)?;
  assert_eq!(record["commit"], release_commit.as_str());
  assert_eq!(record["reached"], "pushed");
  assert_eq!(record["failure"]["transition"], "build");
  let reason = record["failure"]["reason"].as_str().unwrap();
  assert!(reason.contains("is not the release commit"), "reason: {}", reason);
  assert!(reason.contains("check out v0.3.0"), "reason: {}", reason);

  assert_eq!(repo.head()?, moved_head);
  assert!(!repo.path.join("target/package").exists());
  Ok(())
}

#[test]
fn test_dry_run_changes_nothing() -> Result<()> {
  let repo = TestRepo::new("1.2.3")?;
  repo.tag("v1.2.3")?;
  let head = repo.head()?;

  let output = run_cargo_ship_ok(
    &repo.path,
    &["ship", "run", "--channel", "release", "--version", "1.2.4", "--dry-run", "--json"],
  )?;
  let report = stdout_json(&output)?;

  assert_eq!(report["version"], "1.2.4");
  let steps = report["steps"].as_array().unwrap();
  assert_eq!(steps.len(), 5);
  assert_eq!(steps[0]["transition"], "commit");
  assert_eq!(steps[0]["expect"], "would-perform");
  assert_eq!(steps[1]["expect"], "would-perform");
  // No remote configured
  assert_eq!(steps[2]["expect"], "unknown");

  assert_eq!(repo.head()?, head);
  assert_eq!(repo.tags()?, vec!["v1.2.3".to_string()]);
  assert!(repo.read_file("Cargo.toml")?.contains("version = \"1.2.3\""));
  Ok(())
}

#[test]
fn test_explicit_version_must_match_channel() -> Result<()> {
  let repo = TestRepo::new("1.0.0")?;

  let output = run_cargo_ship(
    &repo.path,
    &["ship", "run", "--channel", "release", "--version", "1.1.0-beta.1"],
  )?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("version-conflict"), "stderr: {}", stderr);
  assert!(repo.tags()?.is_empty());
  Ok(())
}

#[test]
fn test_explicit_version_cannot_go_backwards() -> Result<()> {
  let repo = TestRepo::new("2.0.0")?;
  repo.tag("v2.0.0")?;

  let output = run_cargo_ship(&repo.path, &["ship", "run", "--channel", "release", "--version", "1.9.0"])?;
  assert_eq!(output.status.code(), Some(1));
  assert_eq!(repo.tags()?, vec!["v2.0.0".to_string()]);
  Ok(())
}

#[test]
fn test_invalid_version_argument() -> Result<()> {
  let repo = TestRepo::new("1.0.0")?;

  let output = run_cargo_ship(&repo.path, &["ship", "run", "--channel", "release", "--version", "next"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("not valid semver"), "stderr: {}", stderr);
  Ok(())
}
