//! Release context - resolve once, pass everywhere
//!
//! Both commands need the same things: the repository, its config, and the
//! package being released. `ReleaseContext::build` resolves them once in
//! main.rs and commands take `&ReleaseContext`.

use crate::cargo::manifest::PackageManifest;
use crate::cargo::package::PackageLocation;
use crate::core::config::ShipConfig;
use crate::core::error::{ShipError, ShipResult};
use crate::core::vcs::SystemGit;
use crate::release::plan::{PlanOptions, RepositoryState};
use crate::release::version::VersionBump;
use std::path::Path;

pub struct ReleaseContext {
  pub config: ShipConfig,
  pub git: SystemGit,
  pub location: PackageLocation,
  /// Manifest as it was when the command started
  pub manifest: PackageManifest,
}

impl ReleaseContext {
  /// Open the repository containing `cwd` and resolve the package to release
  pub fn build(cwd: &Path) -> ShipResult<Self> {
    let git = SystemGit::open(cwd)?;
    let root = git.work_tree().to_path_buf();
    let config = ShipConfig::load(&root)?;

    let git = match (&config.identity.name, &config.identity.email) {
      (Some(name), Some(email)) => git.with_identity(name.clone(), email.clone()),
      _ => git,
    };

    let location = PackageLocation::resolve(&root, &config.release)?;
    let manifest = PackageManifest::load(&location.manifest_path, location.workspace_manifest.as_deref())?;

    tracing::debug!(
      root = %root.display(),
      package = %manifest.name,
      version = %manifest.version,
      "release context ready"
    );

    Ok(Self {
      config,
      git,
      location,
      manifest,
    })
  }

  pub fn package_name(&self) -> &str {
    &self.manifest.name
  }

  pub fn tag_prefix(&self) -> &str {
    &self.config.release.tag_prefix
  }

  /// Planner options with an optional CLI bump override
  pub fn plan_options(&self, bump: Option<VersionBump>) -> PlanOptions {
    PlanOptions {
      tag_prefix: self.config.release.tag_prefix.clone(),
      bump: bump.unwrap_or(self.config.release.bump),
    }
  }

  /// Snapshot tags, manifest version and commits for the planner
  pub fn repository_state(&self) -> ShipResult<RepositoryState> {
    RepositoryState::capture(&self.git, self.manifest.version.clone(), self.tag_prefix())
  }

  /// Branch the release commit is pushed to
  pub fn release_branch(&self) -> ShipResult<String> {
    if let Some(branch) = &self.config.release.branch {
      return Ok(branch.clone());
    }

    let branch = self.git.current_branch()?;
    if branch == "HEAD" {
      return Err(ShipError::with_help(
        "HEAD is detached, so there is no branch to push the release commit to",
        "Check out the release branch or set `branch` under [release] in ship.toml",
      ));
    }
    Ok(branch)
  }
}
