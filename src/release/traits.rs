//! Collaborators the executor drives
//!
//! The executor only talks to these traits, so tests can swap in
//! in-memory doubles and the real adapters stay thin.

use crate::cargo::package::Artifact;
use crate::core::error::ShipResult;
use semver::Version;

/// Result of writing the release commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  /// A new commit was created
  Created(String),
  /// Files already declared the version; HEAD is the release commit
  Unchanged(String),
}

/// Version control side of a release
pub trait ReleaseRepository {
  fn tag_exists(&self, tag: &str) -> ShipResult<bool>;

  /// Commit a tag points to
  fn tag_target(&self, tag: &str) -> ShipResult<String>;

  fn head_commit(&self) -> ShipResult<String>;

  fn head_subject(&self) -> ShipResult<String>;

  /// Version currently declared by the manifest on disk
  fn manifest_version(&self) -> ShipResult<String>;

  /// Write the version into the manifest (and lockfile) and commit
  fn commit_version(&self, version: &Version, message: &str) -> ShipResult<CommitOutcome>;

  fn create_tag(&self, tag: &str, message: &str, commit: &str) -> ShipResult<()>;

  fn remote_has_tag(&self, tag: &str) -> ShipResult<bool>;

  /// Push the release commit and tag together
  fn push(&self, commit: &str, tag: &str) -> ShipResult<()>;
}

/// Produces the distributable artifact
pub trait ArtifactBuilder {
  fn build(&self, version: &Version) -> ShipResult<Artifact>;
}

/// Package registry
pub trait Registry {
  /// Human-readable registry name for messages
  fn name(&self) -> &str;

  fn is_published(&self, package: &str, version: &Version) -> ShipResult<bool>;

  fn publish(&self, artifact: &Artifact) -> ShipResult<()>;
}
