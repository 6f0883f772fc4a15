//! Channels, bump policies and tag naming

use crate::core::error::ShipResult;
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prerelease label used for the beta channel (`1.3.0-beta.2`)
pub const BETA_LABEL: &str = "beta";

/// Release track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  /// Prerelease cut (`X.Y.Z-beta.N`)
  Beta,
  /// Final cut (`X.Y.Z`)
  #[value(name = "release", alias = "stable")]
  Stable,
}

impl Channel {
  pub fn is_prerelease(&self) -> bool {
    matches!(self, Channel::Beta)
  }

  /// Whether a version belongs to this channel's tag namespace
  pub fn owns(&self, version: &Version) -> bool {
    match self {
      Channel::Beta => beta_number(version).is_some(),
      Channel::Stable => version.pre.is_empty(),
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Channel::Beta => write!(f, "beta"),
      Channel::Stable => write!(f, "stable"),
    }
  }
}

/// Version bump policy for stable increments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// Bug fixes only
  #[default]
  Patch,
  /// New features
  Minor,
  /// Breaking changes
  Major,
  /// Derive from conventional commits since the last stable tag
  Auto,
}

impl VersionBump {
  /// Apply bump to a semver version (prerelease and build metadata are dropped)
  ///
  /// `Auto` must be resolved first; it is treated as `Patch` here.
  pub fn apply(&self, version: &Version) -> Version {
    match self {
      VersionBump::Major => Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch | VersionBump::Auto => Version::new(version.major, version.minor, version.patch + 1),
    }
  }
}

impl fmt::Display for VersionBump {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      VersionBump::Patch => "patch",
      VersionBump::Minor => "minor",
      VersionBump::Major => "major",
      VersionBump::Auto => "auto",
    };
    f.write_str(s)
  }
}

/// `major.minor.patch` with prerelease and build metadata stripped
pub fn base_version(version: &Version) -> Version {
  Version::new(version.major, version.minor, version.patch)
}

/// Numeric suffix of a `beta.N` prerelease label
pub fn beta_number(version: &Version) -> Option<u64> {
  version
    .pre
    .as_str()
    .strip_prefix(BETA_LABEL)
    .and_then(|rest| rest.strip_prefix('.'))
    .and_then(|n| n.parse().ok())
}

/// `base-beta.N`
pub fn beta_version(base: &Version, n: u64) -> ShipResult<Version> {
  let mut version = base_version(base);
  version.pre = Prerelease::new(&format!("{}.{}", BETA_LABEL, n))?;
  version.build = BuildMetadata::EMPTY;
  Ok(version)
}

/// Format a release tag
pub fn format_tag(prefix: &str, version: &Version) -> String {
  format!("{}{}", prefix, version)
}

/// Parse a release tag, ignoring tags outside the prefix namespace
pub fn parse_tag(prefix: &str, tag: &str) -> Option<Version> {
  let version_str = tag.strip_prefix(prefix)?;
  // `v1.2` or `vnext` are not release tags
  Version::parse(version_str).ok()
}
