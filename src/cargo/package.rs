//! Locating the package and building its `.crate` artifact

use crate::core::config::ReleaseConfig;
use crate::core::error::{ConfigError, ReleaseErrorKind, ResultExt, ShipError, ShipResult};
use crate::registry::classify_cargo_failure;
use crate::release::traits::ArtifactBuilder;
use cargo_metadata::MetadataCommand;
use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A packaged crate ready to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub name: String,
  pub version: Version,
  pub path: PathBuf,
  pub sha256: String,
}

impl Artifact {
  /// Describe an existing `.crate` file, hashing its contents
  pub fn from_file(name: impl Into<String>, version: Version, path: PathBuf) -> ShipResult<Self> {
    let bytes = fs::read(&path).with_context(|| format!("Failed to read artifact {}", path.display()))?;
    Ok(Self {
      name: name.into(),
      version,
      sha256: sha256_hex(&bytes),
      path,
    })
  }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  format!("{:x}", hasher.finalize())
}

/// Where the package and its build outputs live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
  pub manifest_path: PathBuf,
  /// Root manifest, for `version.workspace = true`
  pub workspace_manifest: Option<PathBuf>,
  pub lockfile: PathBuf,
  pub target_dir: PathBuf,
}

impl PackageLocation {
  /// Resolve from config: explicit manifest, named package, or the root manifest
  pub fn resolve(root: &Path, config: &ReleaseConfig) -> ShipResult<Self> {
    let root_manifest = root.join("Cargo.toml");
    let workspace_manifest = root_manifest.exists().then(|| root_manifest.clone());

    if let Some(manifest) = &config.manifest {
      return Ok(Self {
        manifest_path: root.join(manifest),
        workspace_manifest,
        lockfile: root.join("Cargo.lock"),
        target_dir: default_target_dir(root),
      });
    }

    let Some(name) = &config.package else {
      return Ok(Self {
        manifest_path: root_manifest,
        workspace_manifest,
        lockfile: root.join("Cargo.lock"),
        target_dir: default_target_dir(root),
      });
    };

    let metadata = MetadataCommand::new()
      .manifest_path(&root_manifest)
      .no_deps()
      .exec()
      .context("Failed to load workspace metadata")?;

    let package = metadata
      .workspace_packages()
      .into_iter()
      .find(|pkg| pkg.name.as_str() == name.as_str())
      .ok_or_else(|| ShipError::Config(ConfigError::PackageNotFound { name: name.clone() }))?;

    let workspace_root = metadata.workspace_root.as_std_path();
    tracing::debug!(package = %name, manifest = %package.manifest_path, "located package");

    Ok(Self {
      manifest_path: package.manifest_path.clone().into_std_path_buf(),
      workspace_manifest: Some(workspace_root.join("Cargo.toml")),
      lockfile: workspace_root.join("Cargo.lock"),
      target_dir: metadata.target_directory.clone().into_std_path_buf(),
    })
  }
}

fn default_target_dir(root: &Path) -> PathBuf {
  std::env::var_os("CARGO_TARGET_DIR")
    .map(PathBuf::from)
    .map(|dir| if dir.is_absolute() { dir } else { root.join(dir) })
    .unwrap_or_else(|| root.join("target"))
}

/// Builds the artifact with `cargo package`
pub struct CargoPackager {
  pub package: String,
  pub manifest_path: PathBuf,
  pub target_dir: PathBuf,
  pub registry: Option<String>,
}

impl CargoPackager {
  /// Path `cargo package` writes for a version
  pub fn crate_path(&self, version: &Version) -> PathBuf {
    self
      .target_dir
      .join("package")
      .join(format!("{}-{}.crate", self.package, version))
  }
}

impl ArtifactBuilder for CargoPackager {
  fn build(&self, version: &Version) -> ShipResult<Artifact> {
    let mut cmd = Command::new("cargo");
    cmd
      .arg("package")
      .arg("--manifest-path")
      .arg(&self.manifest_path)
      .arg("--target-dir")
      .arg(&self.target_dir);
    if let Some(registry) = &self.registry {
      cmd.arg("--registry").arg(registry);
    }

    tracing::debug!(?cmd, "building artifact");
    let output = cmd.output().context("Failed to run cargo package")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ShipError::release(
        classify_cargo_failure(&stderr),
        format!("cargo package failed for {} {}:\n{}", self.package, version, stderr.trim()),
      ));
    }

    let path = self.crate_path(version);
    if !path.exists() {
      return Err(ShipError::release(
        ReleaseErrorKind::CommandFailed,
        format!("cargo package succeeded but {} was not produced", path.display()),
      ));
    }

    Artifact::from_file(self.package.clone(), version.clone(), path)
  }
}
