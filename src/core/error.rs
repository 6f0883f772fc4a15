//! Error types for cargo-ship with contextual messages and exit codes
//!
//! One error type for the whole tool. Release failures carry a
//! [`ReleaseErrorKind`] so the executor can decide what to retry, what to skip,
//! and what to surface, and so the process exit code reflects the failure class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for cargo-ship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid manifest, version conflict)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// The registry refused the publish
  Registry = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-ship
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Release planning/execution errors
  Release(ReleaseError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Create a release error of the given kind
  pub fn release(kind: ReleaseErrorKind, reason: impl Into<String>) -> Self {
    ShipError::Release(ReleaseError::new(kind, reason))
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Release(mut e) => {
        e.reason = format!("{}: {}", ctx_str, e.reason);
        ShipError::Release(e)
      }
      _ => self,
    }
  }

  /// Release error kind, if this is a release error
  pub fn release_kind(&self) -> Option<ReleaseErrorKind> {
    match self {
      ShipError::Release(e) => Some(e.kind),
      _ => None,
    }
  }

  /// Whether a retry with backoff may succeed
  pub fn is_retryable(&self) -> bool {
    matches!(
      self.release_kind(),
      Some(ReleaseErrorKind::NetworkTransient | ReleaseErrorKind::PushRejected)
    )
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ShipError::Config(_) => ExitCode::User,
      ShipError::Git(_) => ExitCode::System,
      ShipError::Release(e) => e.kind.exit_code(),
      ShipError::Io(_) => ExitCode::System,
      ShipError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Git(e) => e.help_message(),
      ShipError::Release(e) => e.kind.help_message(),
      ShipError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Git(e) => write!(f, "{}", e),
      ShipError::Release(e) => write!(f, "{}", e),
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<toml_edit::TomlError> for ShipError {
  fn from(err: toml_edit::TomlError) -> Self {
    ShipError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<cargo_metadata::Error> for ShipError {
  fn from(err: cargo_metadata::Error) -> Self {
    ShipError::message(format!("Cargo metadata error: {}", err))
  }
}

impl From<serde_json::Error> for ShipError {
  fn from(err: serde_json::Error) -> Self {
    ShipError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for ShipError {
  fn from(err: semver::Error) -> Self {
    ShipError::message(format!("Invalid version: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ShipError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ShipError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Config file exists but holds an invalid value
  Invalid { path: PathBuf, reason: String },

  /// Named package is not part of the workspace
  PackageNotFound { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { .. } => Some("Fix the value in ship.toml or remove it to use the default.".to_string()),
      ConfigError::PackageNotFound { .. } => {
        Some("Set `package` under [release] in ship.toml to a workspace member name.".to_string())
      }
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::PackageNotFound { name } => {
        write!(f, "Package '{}' not found in workspace", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run cargo ship from inside a git repository (looked in {})",
        path.display()
      )),
      GitError::CommandFailed { stderr, .. } if stderr.contains("Please tell me who you are") => Some(
        "Configure a commit identity with `git config user.name/user.email` or [identity] in ship.toml.".to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
    }
  }
}

/// Classification of release failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseErrorKind {
  /// Manifest version is missing or not valid semver
  InvalidManifest,
  /// Planned version already exists or would go backwards
  VersionConflict,
  /// Tag is already present (handled as an idempotent skip)
  TagAlreadyExists,
  /// Remote refused the push
  PushRejected,
  /// Registry refused the publish
  RegistryRejected,
  /// Network failure that may succeed on retry
  NetworkTransient,
  /// A git or cargo command failed for any other reason
  CommandFailed,
}

impl ReleaseErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReleaseErrorKind::InvalidManifest => "invalid-manifest",
      ReleaseErrorKind::VersionConflict => "version-conflict",
      ReleaseErrorKind::TagAlreadyExists => "tag-already-exists",
      ReleaseErrorKind::PushRejected => "push-rejected",
      ReleaseErrorKind::RegistryRejected => "registry-rejected",
      ReleaseErrorKind::NetworkTransient => "network-transient",
      ReleaseErrorKind::CommandFailed => "command-failed",
    }
  }

  fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseErrorKind::InvalidManifest | ReleaseErrorKind::VersionConflict | ReleaseErrorKind::TagAlreadyExists => {
        ExitCode::User
      }
      ReleaseErrorKind::PushRejected | ReleaseErrorKind::NetworkTransient | ReleaseErrorKind::CommandFailed => {
        ExitCode::System
      }
      ReleaseErrorKind::RegistryRejected => ExitCode::Registry,
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      ReleaseErrorKind::InvalidManifest => {
        Some("The manifest `version` must be a valid semver string such as \"1.2.3\".".to_string())
      }
      ReleaseErrorKind::VersionConflict => {
        Some("Fetch tags (`git fetch --tags`) or pass an explicit --version.".to_string())
      }
      ReleaseErrorKind::PushRejected => {
        Some("The remote refused the push. Pull the release branch, then re-run the same command.".to_string())
      }
      ReleaseErrorKind::RegistryRejected => Some(
        "The registry refused this version. It needs a human: the version may already exist with different content."
          .to_string(),
      ),
      ReleaseErrorKind::NetworkTransient => Some("Re-run the same command; completed steps are skipped.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A release failure with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseError {
  pub kind: ReleaseErrorKind,
  pub reason: String,
}

impl ReleaseError {
  pub fn new(kind: ReleaseErrorKind, reason: impl Into<String>) -> Self {
    Self {
      kind,
      reason: reason.into(),
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.reason.trim_end(), self.kind)
  }
}

/// Result type alias for cargo-ship
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
