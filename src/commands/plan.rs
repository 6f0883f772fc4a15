//! `cargo ship plan`

use crate::core::context::ReleaseContext;
use crate::core::error::ShipResult;
use crate::release::plan::{self, PlannedRelease};
use crate::release::version::{Channel, VersionBump};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
  package: &'a str,
  manifest_version: &'a str,
  #[serde(flatten)]
  planned: &'a PlannedRelease,
}

/// Run the plan command
pub fn run_plan(ctx: &ReleaseContext, channel: Channel, bump: Option<VersionBump>, json: bool) -> ShipResult<()> {
  let state = ctx.repository_state()?;
  let planned = plan::plan(channel, &state, &ctx.plan_options(bump))?;

  if json {
    let report = PlanReport {
      package: ctx.package_name(),
      manifest_version: &ctx.manifest.version,
      planned: &planned,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  print_plan(ctx, &planned);
  Ok(())
}

pub(crate) fn print_plan(ctx: &ReleaseContext, planned: &PlannedRelease) {
  let icon = if planned.is_prerelease { "🧪" } else { "📦" };
  println!("{} Release plan for '{}'", icon, ctx.package_name());
  println!();
  println!("  Channel:  {}", planned.channel);
  println!("  Manifest: {}", ctx.manifest.version);
  match &planned.previous {
    Some(previous) => println!("  Previous: {}", previous),
    None => println!("  Previous: (no release tags yet)"),
  }
  println!("  Next:     {} (tag {})", planned.version, planned.tag);
  if !planned.is_prerelease {
    println!("  Bump:     {}", planned.bump);
  }
  println!();
}
