//! Package registry access
//!
//! - **cargo_registry**: query and publish through the cargo CLI
//!
//! Failures are classified from cargo's stderr so the executor knows what it
//! may retry.

pub mod cargo_registry;

pub use cargo_registry::CargoRegistry;

use crate::core::error::ReleaseErrorKind;

/// Markers of connectivity problems in cargo output
const TRANSIENT_MARKERS: &[&str] = &[
  "spurious network error",
  "failed to get successful HTTP response",
  "Couldn't resolve host",
  "Could not resolve host",
  "Connection reset",
  "Connection refused",
  "Operation timed out",
  "timed out",
  "SSL connect error",
  "failed to download",
  "failed to update registry",
  "status 429",
  "status 500",
  "status 502",
  "status 503",
  "status 504",
];

/// Markers of the registry refusing a version
const REJECTED_MARKERS: &[&str] = &[
  "already exists",
  "already uploaded",
  "status 400",
  "status 401",
  "status 403",
  "403 Forbidden",
  "401 Unauthorized",
];

/// Classify a failed cargo command that does not publish
pub fn classify_cargo_failure(stderr: &str) -> ReleaseErrorKind {
  if TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m)) {
    ReleaseErrorKind::NetworkTransient
  } else {
    ReleaseErrorKind::CommandFailed
  }
}

/// Classify a failed `cargo publish`
///
/// A refusal is checked first: a duplicate upload must never be retried.
pub fn classify_publish_failure(stderr: &str) -> ReleaseErrorKind {
  if REJECTED_MARKERS.iter().any(|m| stderr.contains(m)) {
    ReleaseErrorKind::RegistryRejected
  } else {
    classify_cargo_failure(stderr)
  }
}
