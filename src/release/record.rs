//! Release record: how far a run got and why it stopped

use crate::cargo::package::Artifact;
use crate::core::error::{ExitCode, ReleaseErrorKind, ShipError};
use crate::release::plan::PlannedRelease;
use crate::release::version::Channel;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::Serialize;
use std::fmt;

/// Last state a release reached, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
  NotStarted,
  Committed,
  Tagged,
  Pushed,
  Built,
  Published,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Stage::NotStarted => "not started",
      Stage::Committed => "committed",
      Stage::Tagged => "tagged",
      Stage::Pushed => "pushed",
      Stage::Built => "built",
      Stage::Published => "published",
    };
    f.write_str(s)
  }
}

/// A step between two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
  Commit,
  Tag,
  Push,
  Build,
  Publish,
}

impl Transition {
  /// Execution order
  pub const ALL: [Transition; 5] = [
    Transition::Commit,
    Transition::Tag,
    Transition::Push,
    Transition::Build,
    Transition::Publish,
  ];

  /// Stage reached when this transition completes
  pub fn target(&self) -> Stage {
    match self {
      Transition::Commit => Stage::Committed,
      Transition::Tag => Stage::Tagged,
      Transition::Push => Stage::Pushed,
      Transition::Build => Stage::Built,
      Transition::Publish => Stage::Published,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Transition::Commit => "commit",
      Transition::Tag => "tag",
      Transition::Push => "push",
      Transition::Build => "build",
      Transition::Publish => "publish",
    }
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Whether a transition did work or found it already done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum StepOutcome {
  Performed(String),
  Skipped(String),
}

impl StepOutcome {
  pub fn is_skipped(&self) -> bool {
    matches!(self, StepOutcome::Skipped(_))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
  pub transition: Transition,
  #[serde(flatten)]
  pub outcome: StepOutcome,
}

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
  pub transition: Transition,
  pub kind: ReleaseErrorKind,
  pub reason: String,
  pub help: Option<String>,
  #[serde(skip)]
  pub exit_code: ExitCode,
}

impl Failure {
  pub fn from_error(transition: Transition, error: &ShipError) -> Self {
    Self {
      transition,
      kind: error.release_kind().unwrap_or(ReleaseErrorKind::CommandFailed),
      reason: error.to_string(),
      help: error.help_message(),
      exit_code: error.exit_code(),
    }
  }
}

/// Coarse status a CI job reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum PublishStatus {
  NotStarted,
  Tagged,
  Published,
  Failed(String),
}

impl fmt::Display for PublishStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishStatus::NotStarted => write!(f, "not started"),
      PublishStatus::Tagged => write!(f, "tagged"),
      PublishStatus::Published => write!(f, "published"),
      PublishStatus::Failed(reason) => write!(f, "failed: {}", reason),
    }
  }
}

/// Everything a run did, for humans and for `--json`
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRecord {
  pub package: String,
  pub version: Version,
  pub channel: Channel,
  pub tag: String,
  pub reached: Stage,
  pub commit: Option<String>,
  pub artifact: Option<Artifact>,
  pub steps: Vec<StepRecord>,
  pub failure: Option<Failure>,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
}

impl ReleaseRecord {
  pub fn start(package: impl Into<String>, planned: &PlannedRelease) -> Self {
    Self {
      package: package.into(),
      version: planned.version.clone(),
      channel: planned.channel,
      tag: planned.tag.clone(),
      reached: Stage::NotStarted,
      commit: None,
      artifact: None,
      steps: Vec::new(),
      failure: None,
      started_at: Utc::now(),
      finished_at: None,
    }
  }

  /// Record a completed transition
  pub fn advance(&mut self, transition: Transition, outcome: StepOutcome) {
    self.reached = transition.target();
    self.steps.push(StepRecord { transition, outcome });
  }

  /// Record a failed transition; `reached` keeps the last good stage
  pub fn fail(&mut self, transition: Transition, error: &ShipError) {
    self.failure = Some(Failure::from_error(transition, error));
  }

  pub fn finish(&mut self) {
    self.finished_at = Some(Utc::now());
  }

  pub fn is_success(&self) -> bool {
    self.failure.is_none() && self.reached == Stage::Published
  }

  pub fn publish_status(&self) -> PublishStatus {
    if let Some(failure) = &self.failure {
      return PublishStatus::Failed(failure.reason.clone());
    }
    match self.reached {
      Stage::Published => PublishStatus::Published,
      Stage::Tagged | Stage::Pushed | Stage::Built => PublishStatus::Tagged,
      Stage::NotStarted | Stage::Committed => PublishStatus::NotStarted,
    }
  }

  /// Steps that found their work already done
  pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
    self.steps.iter().filter(|s| s.outcome.is_skipped())
  }

  pub fn exit_code(&self) -> Option<ExitCode> {
    self.failure.as_ref().map(|f| f.exit_code)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::release::version::VersionBump;

  fn planned() -> PlannedRelease {
    let version = Version::parse("1.3.0-beta.1").unwrap();
    PlannedRelease {
      tag: format!("v{}", version),
      version,
      channel: Channel::Beta,
      is_prerelease: true,
      previous: None,
      bump: VersionBump::Minor,
    }
  }

  #[test]
  fn test_stage_order() {
    assert!(Stage::NotStarted < Stage::Committed);
    assert!(Stage::Pushed < Stage::Published);
    let targets: Vec<_> = Transition::ALL.iter().map(|t| t.target()).collect();
    let mut sorted = targets.clone();
    sorted.sort();
    assert_eq!(targets, sorted);
  }

  #[test]
  fn test_publish_status_follows_stage() {
    let mut record = ReleaseRecord::start("lib-a", &planned());
    assert_eq!(record.publish_status(), PublishStatus::NotStarted);

    record.advance(Transition::Commit, StepOutcome::Performed("abc".into()));
    assert_eq!(record.publish_status(), PublishStatus::NotStarted);

    record.advance(Transition::Tag, StepOutcome::Skipped("tag exists".into()));
    assert_eq!(record.publish_status(), PublishStatus::Tagged);
    assert_eq!(record.skipped().count(), 1);

    for t in [Transition::Push, Transition::Build, Transition::Publish] {
      record.advance(t, StepOutcome::Performed(String::new()));
    }
    assert_eq!(record.publish_status(), PublishStatus::Published);
    assert!(record.is_success());
  }

  #[test]
  fn test_failure_keeps_reached_stage() {
    let mut record = ReleaseRecord::start("lib-a", &planned());
    record.advance(Transition::Commit, StepOutcome::Performed("abc".into()));
    record.advance(Transition::Tag, StepOutcome::Performed("v1.3.0-beta.1".into()));

    let err = ShipError::release(ReleaseErrorKind::PushRejected, "non-fast-forward");
    record.fail(Transition::Push, &err);

    assert_eq!(record.reached, Stage::Tagged);
    assert!(!record.is_success());
    assert_eq!(record.exit_code(), Some(ExitCode::System));
    let failure = record.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ReleaseErrorKind::PushRejected);
    assert!(matches!(record.publish_status(), PublishStatus::Failed(r) if r.contains("non-fast-forward")));
  }

  #[test]
  fn test_record_serializes_for_ci() {
    let mut record = ReleaseRecord::start("lib-a", &planned());
    record.advance(Transition::Commit, StepOutcome::Skipped("already committed".into()));
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["version"], "1.3.0-beta.1");
    assert_eq!(json["reached"], "committed");
    assert_eq!(json["steps"][0]["transition"], "commit");
    assert_eq!(json["steps"][0]["outcome"], "skipped");
    assert_eq!(json["steps"][0]["detail"], "already committed");
  }
}
