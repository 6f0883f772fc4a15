mod cargo;
mod commands;
mod core;
mod registry;
mod release;

use clap::{Parser, Subcommand};
use core::error::{ShipError, print_error};
use release::version::{Channel, VersionBump};
use tracing_subscriber::EnvFilter;

/// Plan and ship beta and stable releases of a crate
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Ship(ShipCli),
}

#[derive(Parser)]
#[command(name = "ship")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct ShipCli {
  /// Show debug logs on stderr (overridden by CARGO_SHIP_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the next version for a channel without changing anything
  Plan {
    /// Release channel
    #[arg(long, value_enum)]
    channel: Channel,
    /// Stable bump policy (default: `bump` from ship.toml, else patch)
    #[arg(long, value_enum)]
    bump: Option<VersionBump>,
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Release: bump, commit, tag, push, package and publish
  ///
  /// Safe to re-run: steps that already happened are skipped.
  Run {
    /// Release channel
    #[arg(long, value_enum)]
    channel: Channel,
    /// Stable bump policy (default: `bump` from ship.toml, else patch)
    #[arg(long, value_enum, conflicts_with = "version")]
    bump: Option<VersionBump>,
    /// Release exactly this version instead of planning one (resumes an existing tag)
    #[arg(long)]
    version: Option<String>,
    /// Show which steps would run or be skipped without changing anything
    #[arg(long)]
    dry_run: bool,
    /// Output the release record in JSON format (useful for CI)
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "cargo_ship=debug" } else { "cargo_ship=warn" };
  let filter = EnvFilter::try_from_env("CARGO_SHIP_LOG").unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let CargoCli::Ship(cli) = CargoCli::parse();
  init_tracing(cli.verbose);

  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(ShipError::from(e).context("Failed to get current directory")),
  };

  // Resolve repository, config and package once
  let ctx = match core::context::ReleaseContext::build(&cwd) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Plan { channel, bump, json } => commands::run_plan(&ctx, channel, bump, json),
    Commands::Run {
      channel,
      bump,
      version,
      dry_run,
      json,
    } => commands::run_release(&ctx, channel, bump, version, dry_run, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ShipError) -> ! {
  tracing::debug!(error = ?err, "command failed");
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
