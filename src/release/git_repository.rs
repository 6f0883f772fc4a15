//! ReleaseRepository over system git and the package manifest

use crate::cargo::manifest::{PackageManifest, update_lockfile};
use crate::cargo::package::PackageLocation;
use crate::core::error::ShipResult;
use crate::core::vcs::SystemGit;
use crate::release::traits::{CommitOutcome, ReleaseRepository};
use semver::Version;
use std::path::{Path, PathBuf};

pub struct GitRepository {
  git: SystemGit,
  location: PackageLocation,
  remote: String,
  branch: String,
}

impl GitRepository {
  pub fn new(git: SystemGit, location: PackageLocation, remote: impl Into<String>, branch: impl Into<String>) -> Self {
    Self {
      git,
      location,
      remote: remote.into(),
      branch: branch.into(),
    }
  }

  #[cfg(test)]
  pub fn git(&self) -> &SystemGit {
    &self.git
  }

  fn load_manifest(&self) -> ShipResult<PackageManifest> {
    PackageManifest::load(&self.location.manifest_path, self.location.workspace_manifest.as_deref())
  }

  /// Whether any of `paths` differs from HEAD
  fn has_changes(&self, paths: &[PathBuf]) -> ShipResult<bool> {
    let mut args = vec!["status".to_string(), "--porcelain".to_string(), "--".to_string()];
    args.extend(paths.iter().map(|p| p.to_string_lossy().to_string()));
    let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let output = self.git.run(&args)?;
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
  }
}

impl ReleaseRepository for GitRepository {
  fn tag_exists(&self, tag: &str) -> ShipResult<bool> {
    self.git.tag_exists(tag)
  }

  fn tag_target(&self, tag: &str) -> ShipResult<String> {
    self.git.tag_target(tag)
  }

  fn head_commit(&self) -> ShipResult<String> {
    self.git.head_commit()
  }

  fn head_subject(&self) -> ShipResult<String> {
    self.git.head_subject()
  }

  fn manifest_version(&self) -> ShipResult<String> {
    Ok(self.load_manifest()?.version)
  }

  fn commit_version(&self, version: &Version, message: &str) -> ShipResult<CommitOutcome> {
    let mut manifest = self.load_manifest()?;
    manifest.set_version(version)?;

    let mut paths = vec![manifest.version_file().to_path_buf()];
    let lockfile = &self.location.lockfile;
    update_lockfile(lockfile, &manifest.name, version)?;
    // An untracked lockfile stays out of the commit
    if self.git.is_tracked(lockfile)? {
      paths.push(lockfile.clone());
    }

    if !self.has_changes(&paths)? {
      return Ok(CommitOutcome::Unchanged(self.git.head_commit()?));
    }

    let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    let sha = self.git.commit_paths(&refs, message)?;
    Ok(CommitOutcome::Created(sha))
  }

  fn create_tag(&self, tag: &str, message: &str, commit: &str) -> ShipResult<()> {
    self.git.create_annotated_tag(tag, message, commit)
  }

  fn remote_has_tag(&self, tag: &str) -> ShipResult<bool> {
    self.git.remote_has_tag(&self.remote, tag)
  }

  fn push(&self, commit: &str, tag: &str) -> ShipResult<()> {
    self.git.push_release(&self.remote, commit, &self.branch, tag)
  }
}
