//! Read and rewrite the package version (Cargo.toml and Cargo.lock)
//!
//! Edits go through toml_edit so formatting and comments survive.

use crate::core::error::{ReleaseErrorKind, ResultExt, ShipError, ShipResult};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

/// Where a package's version string actually lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
  /// `[package] version = "..."`
  Package,
  /// `version.workspace = true`, value in `[workspace.package]` of this file
  Workspace(PathBuf),
}

/// A package manifest and the resolved version declaration
#[derive(Debug, Clone)]
pub struct PackageManifest {
  pub path: PathBuf,
  pub name: String,
  pub version: String,
  pub source: VersionSource,
}

impl PackageManifest {
  /// Load a package manifest
  ///
  /// `workspace_manifest` is consulted when the version is inherited and the
  /// package manifest is not itself the workspace root.
  pub fn load(path: &Path, workspace_manifest: Option<&Path>) -> ShipResult<Self> {
    let doc = read_document(path)?;

    let package = doc
      .get("package")
      .and_then(|p| p.as_table_like())
      .ok_or_else(|| invalid(path, "no [package] table"))?;

    let name = package
      .get("name")
      .and_then(|n| n.as_str())
      .ok_or_else(|| invalid(path, "package.name is missing"))?
      .to_string();

    let version_item = package
      .get("version")
      .ok_or_else(|| invalid(path, "package.version is missing"))?;

    if let Some(version) = version_item.as_str() {
      return Ok(Self {
        path: path.to_path_buf(),
        name,
        version: version.to_string(),
        source: VersionSource::Package,
      });
    }

    let inherits = version_item
      .as_table_like()
      .and_then(|t| t.get("workspace"))
      .and_then(|w| w.as_bool())
      .unwrap_or(false);
    if !inherits {
      return Err(invalid(path, "package.version must be a string or `{ workspace = true }`"));
    }

    if let Some(version) = workspace_version(&doc) {
      return Ok(Self {
        path: path.to_path_buf(),
        name,
        version,
        source: VersionSource::Workspace(path.to_path_buf()),
      });
    }

    let root = workspace_manifest
      .filter(|root| *root != path)
      .ok_or_else(|| invalid(path, "version.workspace = true but no workspace manifest was found"))?;
    let root_doc = read_document(root)?;
    let version = workspace_version(&root_doc)
      .ok_or_else(|| invalid(root, "workspace.package.version is missing"))?;

    Ok(Self {
      path: path.to_path_buf(),
      name,
      version,
      source: VersionSource::Workspace(root.to_path_buf()),
    })
  }

  /// Manifest file that declares the version
  pub fn version_file(&self) -> &Path {
    match &self.source {
      VersionSource::Package => &self.path,
      VersionSource::Workspace(root) => root,
    }
  }

  /// Write a new version into the declaring file
  ///
  /// Returns false when the file already declares `version`.
  pub fn set_version(&mut self, version: &Version) -> ShipResult<bool> {
    let new_version = version.to_string();
    if self.version == new_version {
      return Ok(false);
    }

    let file = self.version_file().to_path_buf();
    let mut doc = read_document(&file)?;

    match &self.source {
      VersionSource::Package => {
        doc["package"]["version"] = toml_edit::value(new_version.as_str());
      }
      VersionSource::Workspace(_) => {
        doc["workspace"]["package"]["version"] = toml_edit::value(new_version.as_str());
      }
    }

    fs::write(&file, doc.to_string()).with_context(|| format!("Failed to write {}", file.display()))?;
    tracing::debug!(file = %file.display(), from = %self.version, to = %new_version, "updated manifest version");

    self.version = new_version;
    Ok(true)
  }
}

/// Rewrite the local package entry in Cargo.lock
///
/// Only entries without a `source` (path packages) are touched. Returns whether
/// the lockfile changed; a missing lockfile is not an error.
pub fn update_lockfile(lock_path: &Path, name: &str, version: &Version) -> ShipResult<bool> {
  if !lock_path.exists() {
    return Ok(false);
  }

  let mut doc = read_document(lock_path)?;
  let new_version = version.to_string();
  let mut changed = false;

  if let Some(packages) = doc.get_mut("package").and_then(|p| p.as_array_of_tables_mut()) {
    for entry in packages.iter_mut() {
      let is_local = entry.get("name").and_then(|n| n.as_str()) == Some(name) && !entry.contains_key("source");
      if !is_local {
        continue;
      }
      if entry.get("version").and_then(|v| v.as_str()) != Some(new_version.as_str()) {
        entry["version"] = toml_edit::value(new_version.as_str());
        changed = true;
      }
    }
  }

  if changed {
    fs::write(lock_path, doc.to_string()).with_context(|| format!("Failed to write {}", lock_path.display()))?;
  }
  Ok(changed)
}

fn workspace_version(doc: &DocumentMut) -> Option<String> {
  doc
    .get("workspace")
    .and_then(|w| w.get("package"))
    .and_then(|p| p.get("version"))
    .and_then(|v| v.as_str())
    .map(|v| v.to_string())
}

fn read_document(path: &Path) -> ShipResult<DocumentMut> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  content
    .parse::<DocumentMut>()
    .map_err(|e| invalid(path, &format!("not valid TOML: {}", e)))
}

fn invalid(path: &Path, reason: &str) -> ShipError {
  ShipError::release(
    ReleaseErrorKind::InvalidManifest,
    format!("{}: {}", path.display(), reason),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
  }

  #[test]
  fn test_set_version_preserves_formatting() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Cargo.toml");
    fs::write(
      &path,
      "[package]\nname = \"lib-a\"\n# bumped by release jobs\nversion = \"1.2.3\"\nedition = \"2021\"\n",
    )
    .unwrap();

    let mut manifest = PackageManifest::load(&path, None).unwrap();
    assert_eq!(manifest.name, "lib-a");
    assert_eq!(manifest.version, "1.2.3");

    assert!(manifest.set_version(&v("1.3.0-beta.1")).unwrap());
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("version = \"1.3.0-beta.1\""));
    assert!(content.contains("# bumped by release jobs"));

    assert!(!manifest.set_version(&v("1.3.0-beta.1")).unwrap());
  }

  #[test]
  fn test_inherited_version_edits_workspace_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Cargo.toml");
    fs::write(
      &root,
      "[workspace]\nmembers = [\"crates/lib-a\"]\n\n[workspace.package]\nversion = \"0.4.0\"\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("crates/lib-a")).unwrap();
    let member = dir.path().join("crates/lib-a/Cargo.toml");
    fs::write(&member, "[package]\nname = \"lib-a\"\nversion.workspace = true\n").unwrap();

    let mut manifest = PackageManifest::load(&member, Some(&root)).unwrap();
    assert_eq!(manifest.version, "0.4.0");
    assert_eq!(manifest.version_file(), root.as_path());

    manifest.set_version(&v("0.5.0")).unwrap();
    assert!(fs::read_to_string(&root).unwrap().contains("version = \"0.5.0\""));
    assert_eq!(
      fs::read_to_string(&member).unwrap(),
      "[package]\nname = \"lib-a\"\nversion.workspace = true\n"
    );
  }

  #[test]
  fn test_missing_version_is_invalid_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Cargo.toml");
    fs::write(&path, "[package]\nname = \"lib-a\"\n").unwrap();

    let err = PackageManifest::load(&path, None).unwrap_err();
    assert_eq!(err.release_kind(), Some(ReleaseErrorKind::InvalidManifest));
  }

  #[test]
  fn test_update_lockfile_only_touches_local_entry() {
    let dir = TempDir::new().unwrap();
    let lock = dir.path().join("Cargo.lock");
    fs::write(
      &lock,
      r#"version = 4

[[package]]
name = "lib-a"
version = "1.2.3"

[[package]]
name = "lib-a"
version = "1.2.3"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#,
    )
    .unwrap();

    assert!(update_lockfile(&lock, "lib-a", &v("1.2.4")).unwrap());
    let content = fs::read_to_string(&lock).unwrap();
    assert_eq!(content.matches("version = \"1.2.4\"").count(), 1);
    assert_eq!(content.matches("version = \"1.2.3\"").count(), 1);

    assert!(!update_lockfile(&lock, "lib-a", &v("1.2.4")).unwrap());
    assert!(!update_lockfile(&dir.path().join("missing.lock"), "lib-a", &v("1.2.4")).unwrap());
  }
}
