//! Version planning: decide what the next release is called
//!
//! Planning is a pure function of [`RepositoryState`]. Reading that state is
//! the only place git is touched, so planning twice without new tags always
//! yields the same version.

use crate::core::error::{ReleaseErrorKind, ShipError, ShipResult};
use crate::core::vcs::SystemGit;
use crate::release::version::{self, Channel, VersionBump, base_version, beta_number, beta_version};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of what the planner needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
  /// Every tag name in the repository
  pub tags: Vec<String>,
  /// Version string declared by the package manifest
  pub manifest_version: String,
  /// Commit messages since the latest stable tag (newest first)
  pub commits: Vec<String>,
}

impl RepositoryState {
  /// Snapshot tags and commit history from git
  pub fn capture(git: &SystemGit, manifest_version: impl Into<String>, tag_prefix: &str) -> ShipResult<Self> {
    let tags = git.list_tags()?;

    let latest_stable = tags
      .iter()
      .filter_map(|t| version::parse_tag(tag_prefix, t).map(|v| (t, v)))
      .filter(|(_, v)| v.pre.is_empty())
      .max_by(|a, b| a.1.cmp(&b.1))
      .map(|(t, _)| t.clone());

    let commits = git.commit_messages_since(latest_stable.as_deref())?;

    Ok(Self {
      tags,
      manifest_version: manifest_version.into(),
      commits,
    })
  }

  /// Versions of all tags in the prefix namespace
  pub fn release_versions(&self, tag_prefix: &str) -> Vec<Version> {
    self
      .tags
      .iter()
      .filter_map(|t| version::parse_tag(tag_prefix, t))
      .collect()
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tags.iter().any(|t| t == tag)
  }
}

/// Knobs that shape a plan
#[derive(Debug, Clone)]
pub struct PlanOptions {
  pub tag_prefix: String,
  pub bump: VersionBump,
}

impl Default for PlanOptions {
  fn default() -> Self {
    Self {
      tag_prefix: "v".to_string(),
      bump: VersionBump::Patch,
    }
  }
}

/// The version a run will produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRelease {
  pub version: Version,
  pub channel: Channel,
  pub tag: String,
  pub is_prerelease: bool,
  /// Highest existing release tag, if any
  pub previous: Option<Version>,
  /// Bump applied when the base came from the latest stable tag
  pub bump: VersionBump,
}

impl PlannedRelease {
  /// Wrap an explicitly requested version (`--version`, or a pending tag)
  ///
  /// The tag may already exist: that is how an unfinished run is resumed.
  pub fn explicit(version: Version, channel: Channel, state: &RepositoryState, tag_prefix: &str) -> ShipResult<Self> {
    if !channel.owns(&version) {
      return Err(ShipError::release(
        ReleaseErrorKind::VersionConflict,
        format!("version {} does not belong to the {} channel", version, channel),
      ));
    }

    let versions = state.release_versions(tag_prefix);
    if let Some(newer) = versions.iter().filter(|v| channel.owns(v)).find(|v| *v > &version) {
      return Err(ShipError::release(
        ReleaseErrorKind::VersionConflict,
        format!("{} {} is older than existing {}", channel, version, newer),
      ));
    }

    Ok(Self {
      tag: version::format_tag(tag_prefix, &version),
      is_prerelease: channel.is_prerelease(),
      previous: versions.into_iter().max(),
      version,
      channel,
      bump: VersionBump::Patch,
    })
  }
}

/// Compute the next version for a channel
pub fn plan(channel: Channel, state: &RepositoryState, options: &PlanOptions) -> ShipResult<PlannedRelease> {
  let manifest = Version::parse(state.manifest_version.trim()).map_err(|e| {
    ShipError::release(
      ReleaseErrorKind::InvalidManifest,
      format!("manifest version '{}' is not valid semver: {}", state.manifest_version, e),
    )
  })?;

  let versions = state.release_versions(&options.tag_prefix);
  let latest_stable = versions.iter().filter(|v| v.pre.is_empty()).max().cloned();
  let previous = versions.iter().max().cloned();

  // Prerelease bases that no stable release has closed yet
  let open_line = versions
    .iter()
    .filter(|v| !v.pre.is_empty())
    .map(base_version)
    .filter(|b| latest_stable.as_ref().is_none_or(|s| b > s))
    .max();

  let bump = resolve_bump(options.bump, &state.commits);
  let candidate = match (&open_line, &latest_stable) {
    (Some(line), _) => line.clone(),
    (None, Some(stable)) => bump.apply(stable),
    (None, None) => base_version(&manifest),
  };

  // A manifest that already declares a newer version wins over the computed bump
  let manifest_base = base_version(&manifest);
  let base = if manifest_base > candidate && latest_stable.as_ref().is_none_or(|s| &manifest_base > s) {
    manifest_base
  } else {
    candidate
  };

  let next = match channel {
    Channel::Stable => base,
    Channel::Beta => {
      let highest = versions
        .iter()
        .filter(|v| base_version(v) == base)
        .filter_map(beta_number)
        .max()
        .unwrap_or(0);
      beta_version(&base, highest + 1)?
    }
  };

  let tag = version::format_tag(&options.tag_prefix, &next);
  if state.has_tag(&tag) {
    return Err(ShipError::release(
      ReleaseErrorKind::VersionConflict,
      format!("planned tag {} already exists", tag),
    ));
  }
  if let Some(newer) = versions.iter().filter(|v| channel.owns(v)).find(|v| *v >= &next) {
    return Err(ShipError::release(
      ReleaseErrorKind::VersionConflict,
      format!("planned {} {} is not greater than existing {}", channel, next, newer),
    ));
  }

  Ok(PlannedRelease {
    is_prerelease: channel.is_prerelease(),
    version: next,
    channel,
    tag,
    previous,
    bump,
  })
}

/// Latest tag that a previous run may have left unfinished
///
/// Only the globally highest release tag can be pending, and only when it
/// belongs to the requested channel. Whether it actually is pending depends on
/// the registry, which the caller asks.
pub fn pending_release(channel: Channel, state: &RepositoryState, tag_prefix: &str) -> Option<Version> {
  state
    .release_versions(tag_prefix)
    .into_iter()
    .max()
    .filter(|v| channel.owns(v))
}

/// Conventional commit type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
  Feat,
  Fix,
  Perf,
  Other,
}

impl CommitType {
  /// Parse commit type from message
  fn from_message(msg: &str) -> Self {
    let first_line = msg.lines().next().unwrap_or("");
    let lower = first_line.to_lowercase();
    let kind = lower.split([':', '(', '!']).next().unwrap_or("").trim();

    match kind {
      "feat" => CommitType::Feat,
      "fix" => CommitType::Fix,
      "perf" => CommitType::Perf,
      _ => CommitType::Other,
    }
  }
}

fn is_breaking(msg: &str) -> bool {
  let subject = msg.lines().next().unwrap_or("");
  let prefix = subject.split(':').next().unwrap_or("");
  msg.contains("BREAKING CHANGE") || msg.contains("BREAKING-CHANGE") || (subject.contains(':') && prefix.ends_with('!'))
}

/// Turn `Auto` into a concrete bump from conventional commits
pub fn resolve_bump(bump: VersionBump, commits: &[String]) -> VersionBump {
  if bump != VersionBump::Auto {
    return bump;
  }

  if commits.iter().any(|c| is_breaking(c)) {
    return VersionBump::Major;
  }

  if commits.iter().any(|c| CommitType::from_message(c) == CommitType::Feat) {
    return VersionBump::Minor;
  }

  // Fixes, perf, docs, chores: all patch-level
  VersionBump::Patch
}
