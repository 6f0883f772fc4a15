//! Registry backed by `cargo info` and `cargo publish`

use super::{classify_cargo_failure, classify_publish_failure};
use crate::cargo::package::{Artifact, sha256_hex};
use crate::core::config::RegistryConfig;
use crate::core::error::{ReleaseErrorKind, ResultExt, ShipError, ShipResult};
use crate::release::traits::Registry;
use semver::Version;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

const CRATES_IO: &str = "crates-io";

pub struct CargoRegistry {
  /// Registry name from `.cargo/config.toml`, None for crates.io
  registry: Option<String>,
  token_env: String,
  manifest_path: PathBuf,
  /// Same target dir as the packager, so publish rewrites the built artifact
  target_dir: PathBuf,
}

impl CargoRegistry {
  pub fn new(config: &RegistryConfig, manifest_path: PathBuf, target_dir: PathBuf) -> Self {
    Self {
      registry: config.name.clone(),
      token_env: config.token_env.clone(),
      manifest_path,
      target_dir,
    }
  }

  /// Variable cargo itself reads the token from
  fn cargo_token_var(&self) -> String {
    match &self.registry {
      None => "CARGO_REGISTRY_TOKEN".to_string(),
      Some(name) => format!("CARGO_REGISTRIES_{}_TOKEN", name.to_uppercase().replace('-', "_")),
    }
  }

  fn token(&self) -> ShipResult<String> {
    env::var(&self.token_env).map_err(|_| {
      ShipError::with_help(
        format!("{} not found in environment", self.token_env),
        format!(
          "Export a publish token before releasing:\n  export {}=<your-token>\n\nFor crates.io, create one at https://crates.io/me",
          self.token_env
        ),
      )
    })
  }
}

impl Registry for CargoRegistry {
  fn name(&self) -> &str {
    self.registry.as_deref().unwrap_or(CRATES_IO)
  }

  fn is_published(&self, package: &str, version: &Version) -> ShipResult<bool> {
    // Outside any workspace so cargo can't answer from local sources
    let output = Command::new("cargo")
      .current_dir(env::temp_dir())
      .arg("info")
      .arg(format!("{}@{}", package, version))
      .arg("--registry")
      .arg(self.name())
      .output()
      .context("Failed to run cargo info")?;

    if output.status.success() {
      return Ok(true);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("could not find") {
      return Ok(false);
    }

    Err(ShipError::release(
      classify_cargo_failure(&stderr),
      format!("could not query {} for {} {}: {}", self.name(), package, version, stderr.trim()),
    ))
  }

  fn publish(&self, artifact: &Artifact) -> ShipResult<()> {
    let token = self.token()?;

    // Already verified by `cargo package`
    let mut cmd = Command::new("cargo");
    cmd
      .arg("publish")
      .arg("--manifest-path")
      .arg(&self.manifest_path)
      .arg("--target-dir")
      .arg(&self.target_dir)
      .arg("--no-verify")
      .env(self.cargo_token_var(), token);
    if let Some(registry) = &self.registry {
      cmd.arg("--registry").arg(registry);
    }

    tracing::info!(package = %artifact.name, version = %artifact.version, sha256 = %artifact.sha256, registry = self.name(), "publishing");
    let output = cmd.output().context("Failed to run cargo publish")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ShipError::release(
        classify_publish_failure(&stderr),
        format!(
          "{} refused {} {}: {}",
          self.name(),
          artifact.name,
          artifact.version,
          stderr.trim()
        ),
      ));
    }

    verify_upload(artifact)
  }
}

/// Check that the package `cargo publish` produced is the one that was built
///
/// `cargo publish` packages again into the same path, overwriting the artifact.
fn verify_upload(artifact: &Artifact) -> ShipResult<()> {
  let bytes = fs::read(&artifact.path)
    .with_context(|| format!("Failed to read published package {}", artifact.path.display()))?;
  let uploaded = sha256_hex(&bytes);
  if uploaded != artifact.sha256 {
    return Err(ShipError::release(
      ReleaseErrorKind::CommandFailed,
      format!(
        "uploaded {} {} has sha256 {} but the built artifact had {}; the working tree changed between build and publish",
        artifact.name, artifact.version, uploaded, artifact.sha256
      ),
    ));
  }
  tracing::debug!(sha256 = %uploaded, "uploaded package matches built artifact");
  Ok(())
}
