//! Release executor: drive a planned release through its transitions
//!
//! ```text
//! NotStarted ─commit─▶ Committed ─tag─▶ Tagged ─push─▶ Pushed ─build─▶ Built ─publish─▶ Published
//! ```
//!
//! Every transition first checks whether its effect already exists and skips
//! itself if so. Re-running the same command after a failure resumes where the
//! previous run stopped and never duplicates a commit, tag or upload.

use crate::core::config::render_template;
use crate::core::error::{ReleaseErrorKind, ShipError, ShipResult};
use crate::release::plan::PlannedRelease;
use crate::release::record::{ReleaseRecord, StepOutcome, Transition};
use crate::release::retry::{RetryPolicy, with_retry};
use crate::release::traits::{ArtifactBuilder, CommitOutcome, Registry, ReleaseRepository};
use serde::Serialize;

/// Commit and tag message templates (`{tag}`, `{version}`, `{package}`)
#[derive(Debug, Clone)]
pub struct ReleaseMessages {
  pub commit: String,
  pub tag: String,
}

impl Default for ReleaseMessages {
  fn default() -> Self {
    Self {
      commit: "chore(release): {tag}".to_string(),
      tag: "Release {package} {tag}".to_string(),
    }
  }
}

/// What a dry run expects each transition to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "expect", content = "detail", rename_all = "kebab-case")]
pub enum Expectation {
  WouldPerform(String),
  AlreadyDone(String),
  /// The check itself failed (e.g. remote unreachable)
  Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepPreview {
  pub transition: Transition,
  #[serde(flatten)]
  pub expectation: Expectation,
}

pub struct Executor<'a> {
  package: String,
  repo: &'a dyn ReleaseRepository,
  builder: &'a dyn ArtifactBuilder,
  registry: &'a dyn Registry,
  retry: RetryPolicy,
  messages: ReleaseMessages,
  /// Print per-step progress lines (off for `--json`)
  progress: bool,
}

/// State carried between transitions within one run
#[derive(Default)]
struct RunState {
  already_published: bool,
}

impl<'a> Executor<'a> {
  pub fn new(
    package: impl Into<String>,
    repo: &'a dyn ReleaseRepository,
    builder: &'a dyn ArtifactBuilder,
    registry: &'a dyn Registry,
  ) -> Self {
    Self {
      package: package.into(),
      repo,
      builder,
      registry,
      retry: RetryPolicy::default(),
      messages: ReleaseMessages::default(),
      progress: true,
    }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_messages(mut self, messages: ReleaseMessages) -> Self {
    self.messages = messages;
    self
  }

  pub fn with_progress(mut self, progress: bool) -> Self {
    self.progress = progress;
    self
  }

  fn commit_message(&self, planned: &PlannedRelease) -> String {
    render_template(&self.messages.commit, &self.package, &planned.version, &planned.tag)
  }

  fn tag_message(&self, planned: &PlannedRelease) -> String {
    render_template(&self.messages.tag, &self.package, &planned.version, &planned.tag)
  }

  /// Run every remaining transition and report how far the release got
  ///
  /// Never returns an error: failures end up in the record.
  pub fn execute(&self, planned: &PlannedRelease) -> ReleaseRecord {
    let mut record = ReleaseRecord::start(&self.package, planned);
    let mut state = RunState::default();

    tracing::info!(package = %self.package, version = %planned.version, tag = %planned.tag, "executing release");

    for transition in Transition::ALL {
      let result = match transition {
        Transition::Commit => self.commit(planned, &mut record),
        Transition::Tag => self.tag(planned, &record),
        Transition::Push => self.push(planned, &record),
        Transition::Build => self.build(planned, &mut record, &mut state),
        Transition::Publish => self.publish(planned, &record, &state),
      };

      match result {
        Ok(outcome) => {
          if self.progress {
            match &outcome {
              StepOutcome::Performed(detail) => println!("   ✅ {}: {}", transition, detail),
              StepOutcome::Skipped(detail) => println!("   ⏭️  {}: {}", transition, detail),
            }
          }
          tracing::debug!(%transition, ?outcome, "transition complete");
          record.advance(transition, outcome);
        }
        Err(err) => {
          if self.progress {
            println!("   ❌ {}: {}", transition, err);
          }
          tracing::warn!(%transition, error = %err, reached = %record.reached, "release stopped");
          record.fail(transition, &err);
          break;
        }
      }
    }

    record.finish();
    record
  }

  fn commit(&self, planned: &PlannedRelease, record: &mut ReleaseRecord) -> ShipResult<StepOutcome> {
    if self.repo.tag_exists(&planned.tag)? {
      let sha = self.repo.tag_target(&planned.tag)?;
      record.commit = Some(sha.clone());
      return Ok(StepOutcome::Skipped(format!("{} already marks {}", planned.tag, short(&sha))));
    }

    let message = self.commit_message(planned);
    let subject = message.lines().next().unwrap_or_default().trim();
    let version = planned.version.to_string();
    if self.repo.head_subject()? == subject && self.repo.manifest_version()? == version {
      let sha = self.repo.head_commit()?;
      record.commit = Some(sha.clone());
      return Ok(StepOutcome::Skipped(format!("HEAD {} is already the release commit", short(&sha))));
    }

    match self.repo.commit_version(&planned.version, &message)? {
      CommitOutcome::Created(sha) => {
        record.commit = Some(sha.clone());
        Ok(StepOutcome::Performed(format!("{} \"{}\"", short(&sha), subject)))
      }
      CommitOutcome::Unchanged(sha) => {
        record.commit = Some(sha.clone());
        Ok(StepOutcome::Skipped(format!(
          "manifest already declares {} at {}",
          version,
          short(&sha)
        )))
      }
    }
  }

  fn tag(&self, planned: &PlannedRelease, record: &ReleaseRecord) -> ShipResult<StepOutcome> {
    if self.repo.tag_exists(&planned.tag)? {
      return Ok(StepOutcome::Skipped(format!("{} already exists", planned.tag)));
    }

    let commit = release_commit(record)?;
    match self.repo.create_tag(&planned.tag, &self.tag_message(planned), commit) {
      Ok(()) => Ok(StepOutcome::Performed(format!("{} on {}", planned.tag, short(commit)))),
      Err(err) if err.release_kind() == Some(ReleaseErrorKind::TagAlreadyExists) => {
        Ok(StepOutcome::Skipped(format!("{} already exists", planned.tag)))
      }
      Err(err) => Err(err),
    }
  }

  fn push(&self, planned: &PlannedRelease, record: &ReleaseRecord) -> ShipResult<StepOutcome> {
    let on_remote = with_retry(&self.retry, "remote tag lookup", |_| self.repo.remote_has_tag(&planned.tag))?;
    if on_remote {
      return Ok(StepOutcome::Skipped(format!("remote already has {}", planned.tag)));
    }

    let commit = release_commit(record)?;
    with_retry(&self.retry, "push", |attempt| {
      // A push whose response was lost may still have landed
      if attempt > 1 && self.repo.remote_has_tag(&planned.tag)? {
        return Ok(());
      }
      self.repo.push(commit, &planned.tag)
    })?;

    Ok(StepOutcome::Performed(format!("{} and {}", short(commit), planned.tag)))
  }

  fn build(&self, planned: &PlannedRelease, record: &mut ReleaseRecord, state: &mut RunState) -> ShipResult<StepOutcome> {
    let commit = release_commit(record)?.to_string();
    let head = self.repo.head_commit()?;

    // Packaging reads the working tree, so it must be the tagged tree
    if head != commit {
      return match self.published(planned) {
        Ok(true) => {
          state.already_published = true;
          Ok(self.already_published_outcome(planned))
        }
        lookup => {
          if let Err(err) = lookup {
            tracing::debug!(error = %err, "registry lookup failed while HEAD is off the release commit");
          }
          Err(ShipError::release(
            ReleaseErrorKind::CommandFailed,
            format!(
              "HEAD {} is not the release commit {} of {}; check out {} and re-run",
              short(&head),
              short(&commit),
              planned.tag,
              planned.tag
            ),
          ))
        }
      };
    }

    if self.published(planned)? {
      state.already_published = true;
      return Ok(self.already_published_outcome(planned));
    }

    let artifact = self.builder.build(&planned.version)?;
    let detail = format!("{} (sha256 {})", artifact.path.display(), short(&artifact.sha256));
    record.artifact = Some(artifact);
    Ok(StepOutcome::Performed(detail))
  }

  fn publish(&self, planned: &PlannedRelease, record: &ReleaseRecord, state: &RunState) -> ShipResult<StepOutcome> {
    if state.already_published {
      return Ok(StepOutcome::Skipped(format!("already on {}", self.registry.name())));
    }

    let artifact = record.artifact.as_ref().ok_or_else(|| {
      ShipError::release(ReleaseErrorKind::CommandFailed, "no artifact was built for this run")
    })?;

    let landed_earlier = with_retry(&self.retry, "publish", |attempt| {
      // An upload whose response was lost may still have landed
      if attempt > 1 && self.registry.is_published(&self.package, &planned.version)? {
        return Ok(true);
      }
      self.registry.publish(artifact).map(|()| false)
    })?;

    if landed_earlier {
      return Ok(StepOutcome::Skipped(format!(
        "{} {} landed on {} during an earlier attempt",
        self.package,
        planned.version,
        self.registry.name()
      )));
    }
    Ok(StepOutcome::Performed(format!(
      "{} {} to {}",
      self.package,
      planned.version,
      self.registry.name()
    )))
  }

  fn already_published_outcome(&self, planned: &PlannedRelease) -> StepOutcome {
    StepOutcome::Skipped(format!(
      "{} {} is already on {}",
      self.package,
      planned.version,
      self.registry.name()
    ))
  }

  fn published(&self, planned: &PlannedRelease) -> ShipResult<bool> {
    with_retry(&self.retry, "registry lookup", |_| {
      self.registry.is_published(&self.package, &planned.version)
    })
  }

  /// Report what `execute` would do without changing anything
  pub fn inspect(&self, planned: &PlannedRelease) -> Vec<StepPreview> {
    let tag_exists = self.repo.tag_exists(&planned.tag);
    let published = self.registry.is_published(&self.package, &planned.version);
    let head_moved = match &tag_exists {
      Ok(true) => match (self.repo.tag_target(&planned.tag), self.repo.head_commit()) {
        (Ok(target), Ok(head)) => target != head,
        _ => false,
      },
      _ => false,
    };

    Transition::ALL
      .iter()
      .map(|&transition| {
        let expectation = match transition {
          Transition::Commit => self.inspect_commit(planned, &tag_exists),
          Transition::Tag => match &tag_exists {
            Ok(true) => Expectation::AlreadyDone(format!("{} exists", planned.tag)),
            Ok(false) => Expectation::WouldPerform(format!("create {}", planned.tag)),
            Err(e) => Expectation::Unknown(e.to_string()),
          },
          Transition::Push => match self.repo.remote_has_tag(&planned.tag) {
            Ok(true) => Expectation::AlreadyDone(format!("remote has {}", planned.tag)),
            Ok(false) => Expectation::WouldPerform(format!("push release commit and {}", planned.tag)),
            Err(e) => Expectation::Unknown(e.to_string()),
          },
          Transition::Build | Transition::Publish => match &published {
            Ok(true) => Expectation::AlreadyDone(format!("already on {}", self.registry.name())),
            Ok(false) if transition == Transition::Build && head_moved => Expectation::Unknown(format!(
              "HEAD is not the release commit; check out {} first",
              planned.tag
            )),
            Ok(false) if transition == Transition::Build => {
              Expectation::WouldPerform(format!("package {} {}", self.package, planned.version))
            }
            Ok(false) => Expectation::WouldPerform(format!("publish to {}", self.registry.name())),
            Err(e) => Expectation::Unknown(e.to_string()),
          },
        };
        StepPreview {
          transition,
          expectation,
        }
      })
      .collect()
  }

  fn inspect_commit(&self, planned: &PlannedRelease, tag_exists: &ShipResult<bool>) -> Expectation {
    if let Ok(true) = tag_exists {
      return Expectation::AlreadyDone(format!("{} marks the release commit", planned.tag));
    }

    let message = self.commit_message(planned);
    let subject = message.lines().next().unwrap_or_default().trim().to_string();
    match (self.repo.head_subject(), self.repo.manifest_version()) {
      (Ok(head), Ok(version)) if head == subject && version == planned.version.to_string() => {
        Expectation::AlreadyDone("HEAD is the release commit".to_string())
      }
      (Ok(_), Ok(version)) => Expectation::WouldPerform(format!("{} → {}, commit \"{}\"", version, planned.version, subject)),
      (Err(e), _) | (_, Err(e)) => Expectation::Unknown(e.to_string()),
    }
  }
}

fn release_commit(record: &ReleaseRecord) -> ShipResult<&str> {
  record
    .commit
    .as_deref()
    .ok_or_else(|| ShipError::release(ReleaseErrorKind::CommandFailed, "release commit is unknown"))
}

fn short(sha: &str) -> &str {
  &sha[..12.min(sha.len())]
}
