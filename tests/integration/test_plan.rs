//! Integration tests for `cargo ship plan`

use crate::helpers::{TestRepo, run_cargo_ship, run_cargo_ship_ok, stdout_json};
use anyhow::Result;

#[test]
fn test_plan_stable_bumps_patch() -> Result<()> {
  let repo = TestRepo::new("1.2.3")?;
  repo.tag("v1.2.3")?;

  let output = run_cargo_ship_ok(&repo.path, &["ship", "plan", "--channel", "release"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("1.2.4"), "stdout: {}", stdout);
  assert!(stdout.contains("v1.2.4"), "stdout: {}", stdout);
  Ok(())
}

#[test]
fn test_plan_beta_increments_label() -> Result<()> {
  let repo = TestRepo::new("1.2.3")?;
  repo.tag("v1.2.3")?;
  repo.write_file("src/lib.rs", "pub fn feature() {}\n")?;
  repo.commit("feat: new feature")?;
  repo.tag("v1.3.0-beta.1")?;
  repo.write_file("src/lib.rs", "pub fn feature() -> u8 { 1 }\n")?;
  repo.commit("fix: return a value")?;
  repo.tag("v1.3.0-beta.2")?;

  let output = run_cargo_ship_ok(&repo.path, &["ship", "plan", "--channel", "beta", "--json"])?;
  let json = stdout_json(&output)?;

  assert_eq!(json["version"], "1.3.0-beta.3");
  assert_eq!(json["tag"], "v1.3.0-beta.3");
  assert_eq!(json["is_prerelease"], true);
  assert_eq!(json["package"], "lib-a");
  Ok(())
}

#[test]
fn test_plan_is_repeatable() -> Result<()> {
  let repo = TestRepo::new("0.4.0")?;
  repo.tag("v0.4.0")?;

  let first = stdout_json(&run_cargo_ship_ok(&repo.path, &["ship", "plan", "--channel", "beta", "--json"])?)?;
  let second = stdout_json(&run_cargo_ship_ok(&repo.path, &["ship", "plan", "--channel", "beta", "--json"])?)?;

  assert_eq!(first["version"], "0.4.1-beta.1");
  assert_eq!(first["version"], second["version"]);
  assert_eq!(repo.tags()?, vec!["v0.4.0".to_string()]);
  Ok(())
}

#[test]
fn test_plan_bump_override_and_auto() -> Result<()> {
  let repo = TestRepo::new("1.0.0")?;
  repo.tag("v1.0.0")?;
  repo.write_file("src/lib.rs", "pub fn added() {}\n")?;
  repo.commit("feat: add a function")?;

  let minor = stdout_json(&run_cargo_ship_ok(
    &repo.path,
    &["ship", "plan", "--channel", "release", "--bump", "minor", "--json"],
  )?)?;
  assert_eq!(minor["version"], "1.1.0");

  let auto = stdout_json(&run_cargo_ship_ok(
    &repo.path,
    &["ship", "plan", "--channel", "release", "--bump", "auto", "--json"],
  )?)?;
  assert_eq!(auto["version"], "1.1.0");
  assert_eq!(auto["bump"], "minor");
  Ok(())
}

#[test]
fn test_plan_bump_from_config() -> Result<()> {
  let repo = TestRepo::new("1.0.0")?;
  repo.tag("v1.0.0")?;
  let config = repo.read_file("ship.toml")?;
  repo.write_file("ship.toml", &format!("[release]\nbump = \"major\"\n{}", config))?;

  let json = stdout_json(&run_cargo_ship_ok(&repo.path, &["ship", "plan", "--channel", "release", "--json"])?)?;
  assert_eq!(json["version"], "2.0.0");
  Ok(())
}

#[test]
fn test_plan_invalid_manifest_version() -> Result<()> {
  let repo = TestRepo::new("one.two")?;

  let output = run_cargo_ship(&repo.path, &["ship", "plan", "--channel", "release"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("invalid-manifest"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_plan_outside_repository_fails() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_cargo_ship(dir.path(), &["ship", "plan", "--channel", "release"])?;
  assert_eq!(output.status.code(), Some(2));
  Ok(())
}
