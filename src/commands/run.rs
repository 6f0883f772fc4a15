//! `cargo ship run`
//!
//! Resolves the target version (explicit, pending, or freshly planned), then
//! hands it to the executor. Re-running the same command after a failure
//! resumes the same release.

use crate::cargo::package::CargoPackager;
use crate::commands::plan::print_plan;
use crate::core::context::ReleaseContext;
use crate::core::error::{ExitCode, ShipError, ShipResult};
use crate::registry::CargoRegistry;
use crate::release::executor::{Executor, Expectation, ReleaseMessages, StepPreview};
use crate::release::git_repository::GitRepository;
use crate::release::plan::{self, PlanOptions, PlannedRelease, RepositoryState};
use crate::release::record::{PublishStatus, ReleaseRecord};
use crate::release::retry::{RetryPolicy, with_retry};
use crate::release::traits::Registry;
use crate::release::version::{Channel, VersionBump};
use semver::Version;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DryRunReport<'a> {
  package: &'a str,
  #[serde(flatten)]
  planned: &'a PlannedRelease,
  steps: &'a [StepPreview],
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
  #[serde(flatten)]
  record: &'a ReleaseRecord,
  publish_status: PublishStatus,
}

/// Run the release command
pub fn run_release(
  ctx: &ReleaseContext,
  channel: Channel,
  bump: Option<VersionBump>,
  version: Option<String>,
  dry_run: bool,
  json: bool,
) -> ShipResult<()> {
  let retry = RetryPolicy::from_config(&ctx.config.retry);
  let registry = CargoRegistry::new(
    &ctx.config.registry,
    ctx.location.manifest_path.clone(),
    ctx.location.target_dir.clone(),
  );

  let state = ctx.repository_state()?;
  let planned = resolve_release(
    ctx.package_name(),
    channel,
    version.as_deref(),
    &state,
    &ctx.plan_options(bump),
    &registry,
    &retry,
    json,
  )?;

  let repo = GitRepository::new(
    ctx.git.clone(),
    ctx.location.clone(),
    ctx.config.release.remote.clone(),
    ctx.release_branch()?,
  );
  let packager = CargoPackager {
    package: ctx.package_name().to_string(),
    manifest_path: ctx.location.manifest_path.clone(),
    target_dir: ctx.location.target_dir.clone(),
    registry: ctx.config.registry.name.clone(),
  };
  let executor = Executor::new(ctx.package_name(), &repo, &packager, &registry)
    .with_retry(retry)
    .with_messages(ReleaseMessages {
      commit: ctx.config.release.commit_message.clone(),
      tag: ctx.config.release.tag_message.clone(),
    })
    .with_progress(!json);

  if dry_run {
    let steps = executor.inspect(&planned);
    if json {
      let report = DryRunReport {
        package: ctx.package_name(),
        planned: &planned,
        steps: &steps,
      };
      println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
      print_plan(ctx, &planned);
      print_preview(&steps);
    }
    return Ok(());
  }

  if !json {
    print_plan(ctx, &planned);
    println!("🚀 Releasing {} {} via {}", ctx.package_name(), planned.version, registry.name());
  }

  let record = executor.execute(&planned);

  if json {
    let report = RunReport {
      record: &record,
      publish_status: record.publish_status(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_summary(&record, channel);
  }

  if !record.is_success() {
    let code = record.exit_code().unwrap_or(ExitCode::System);
    std::process::exit(code.as_i32());
  }
  Ok(())
}

/// Pick the version this run releases
///
/// An explicit `--version` wins. Otherwise a tagged but unpublished release in
/// this channel is resumed before anything new is planned.
#[allow(clippy::too_many_arguments)]
fn resolve_release(
  package: &str,
  channel: Channel,
  explicit: Option<&str>,
  state: &RepositoryState,
  options: &PlanOptions,
  registry: &dyn Registry,
  retry: &RetryPolicy,
  quiet: bool,
) -> ShipResult<PlannedRelease> {
  let prefix = options.tag_prefix.as_str();

  if let Some(raw) = explicit {
    let version = Version::parse(raw.strip_prefix(prefix).unwrap_or(raw)).map_err(|e| {
      ShipError::with_help(
        format!("--version '{}' is not valid semver: {}", raw, e),
        "Pass a full version such as 1.4.0 or 1.4.0-beta.2",
      )
    })?;
    return PlannedRelease::explicit(version, channel, state, prefix);
  }

  if let Some(pending) = plan::pending_release(channel, state, prefix) {
    let published = with_retry(retry, "registry lookup", |_| {
      registry.is_published(package, &pending)
    })
    .map_err(|e| e.context(format!("Failed to check whether {} {} is published", package, pending)))?;

    if !published {
      tracing::info!(version = %pending, "resuming tagged but unpublished release");
      if !quiet {
        println!("🔁 {}{} is tagged but not published, resuming it", prefix, pending);
      }
      return PlannedRelease::explicit(pending, channel, state, prefix);
    }
  }

  plan::plan(channel, state, options)
}

fn print_preview(steps: &[StepPreview]) {
  println!("🔍 Dry-run mode (no changes applied)");
  println!();
  for step in steps {
    match &step.expectation {
      Expectation::WouldPerform(detail) => println!("   ▶️  {}: would {}", step.transition, detail),
      Expectation::AlreadyDone(detail) => println!("   ⏭️  {}: already done ({})", step.transition, detail),
      Expectation::Unknown(reason) => println!("   ❓ {}: unknown ({})", step.transition, reason.trim()),
    }
  }
  println!();
}

fn print_summary(record: &ReleaseRecord, channel: Channel) {
  println!();
  match record.publish_status() {
    PublishStatus::Published => {
      let skipped = record.skipped().count();
      if skipped == record.steps.len() {
        println!("✅ {} {} was already released; nothing to do", record.package, record.version);
      } else {
        println!("🎉 Released {} {} ({})", record.package, record.version, record.tag);
      }
      if let Some(artifact) = &record.artifact {
        println!("   sha256: {}", artifact.sha256);
      }
    }
    _ => {
      let Some(failure) = &record.failure else {
        return;
      };
      eprintln!(
        "❌ Release stopped at '{}' (reached: {})",
        failure.transition, record.reached
      );
      eprintln!("   {}", failure.reason.trim());
      if let Some(help) = &failure.help {
        eprintln!();
        eprintln!("💡 Help: {}", help);
      }
      eprintln!();
      eprintln!("Completed steps are skipped on re-run. To resume:");
      let channel_arg = match channel {
        Channel::Beta => "beta",
        Channel::Stable => "release",
      };
      eprintln!("  cargo ship run --channel {} --version {}", channel_arg, record.version);
    }
  }
}
