use crate::core::error::{ConfigError, ResultExt, ShipError, ShipResult};
use crate::release::version::VersionBump;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for cargo-ship
/// Searched in order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
///
/// Every section is optional; a repository without a config file releases the
/// root package to crates.io with `v`-prefixed tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipConfig {
  #[serde(default)]
  pub release: ReleaseConfig,
  #[serde(default)]
  pub registry: RegistryConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub identity: IdentityConfig,
}

/// What to release and how to name it
///
/// ```toml
/// [release]
/// package = "my-crate"
/// tag_prefix = "v"
/// remote = "origin"
/// branch = "main"
/// bump = "patch"
/// commit_message = "chore(release): {tag}"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Package to release (default: the package in the root manifest)
  #[serde(default)]
  pub package: Option<String>,

  /// Manifest path relative to the repository root (overrides `package` lookup)
  #[serde(default)]
  pub manifest: Option<PathBuf>,

  #[serde(default = "default_tag_prefix")]
  pub tag_prefix: String,

  #[serde(default = "default_remote")]
  pub remote: String,

  /// Branch to push the release commit to (default: current branch)
  #[serde(default)]
  pub branch: Option<String>,

  /// Stable bump policy when the manifest doesn't already declare a newer version
  #[serde(default)]
  pub bump: VersionBump,

  #[serde(default = "default_commit_message")]
  pub commit_message: String,

  #[serde(default = "default_tag_message")]
  pub tag_message: String,
}

fn default_tag_prefix() -> String {
  "v".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_commit_message() -> String {
  "chore(release): {tag}".to_string()
}

fn default_tag_message() -> String {
  "Release {package} {tag}".to_string()
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      package: None,
      manifest: None,
      tag_prefix: default_tag_prefix(),
      remote: default_remote(),
      branch: None,
      bump: VersionBump::default(),
      commit_message: default_commit_message(),
      tag_message: default_tag_message(),
    }
  }
}

/// Target registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
  /// Registry name from `.cargo/config.toml` (default: crates.io)
  #[serde(default)]
  pub name: Option<String>,

  /// Environment variable holding the publish token
  #[serde(default = "default_token_env")]
  pub token_env: String,
}

fn default_token_env() -> String {
  "CARGO_REGISTRY_TOKEN".to_string()
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      name: None,
      token_env: default_token_env(),
    }
  }
}

/// Retry policy for push, publish and remote queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_initial_backoff_ms")]
  pub initial_backoff_ms: u64,
  #[serde(default = "default_max_backoff_ms")]
  pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
  3
}

fn default_initial_backoff_ms() -> u64 {
  2_000
}

fn default_max_backoff_ms() -> u64 {
  30_000
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      initial_backoff_ms: default_initial_backoff_ms(),
      max_backoff_ms: default_max_backoff_ms(),
    }
  }
}

impl RetryConfig {
  pub fn initial_backoff(&self) -> Duration {
    Duration::from_millis(self.initial_backoff_ms)
  }

  pub fn max_backoff(&self) -> Duration {
    Duration::from_millis(self.max_backoff_ms)
  }
}

/// Commit identity override; git config is used when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
}

impl ShipConfig {
  /// Find config file in search order: ship.toml, .ship.toml, .cargo/ship.toml, .config/ship.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("ship.toml"),
      path.join(".ship.toml"),
      path.join(".cargo").join("ship.toml"),
      path.join(".config").join("ship.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, falling back to defaults when no file exists
  pub fn load(path: &Path) -> ShipResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!("no ship.toml under {}, using defaults", path.display());
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: ShipConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate().map_err(|reason| {
      ShipError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason,
      })
    })?;

    tracing::debug!("loaded config from {}", config_path.display());
    Ok(config)
  }

  fn validate(&self) -> Result<(), String> {
    if self.release.remote.trim().is_empty() {
      return Err("release.remote must not be empty".to_string());
    }
    if self.release.tag_prefix.chars().any(|c| c.is_whitespace() || c == '~' || c == '^' || c == ':') {
      return Err(format!(
        "release.tag_prefix '{}' contains characters not allowed in git tags",
        self.release.tag_prefix
      ));
    }
    if self.release.commit_message.trim().is_empty() {
      return Err("release.commit_message must not be empty".to_string());
    }
    if self.retry.max_attempts == 0 {
      return Err("retry.max_attempts must be at least 1".to_string());
    }
    if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
      return Err("retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string());
    }
    if self.identity.name.is_some() != self.identity.email.is_some() {
      return Err("identity.name and identity.email must be set together".to_string());
    }
    Ok(())
  }
}

/// Fill `{version}`, `{tag}` and `{package}` placeholders in a message template
pub fn render_template(template: &str, package: &str, version: &semver::Version, tag: &str) -> String {
  template
    .replace("{version}", &version.to_string())
    .replace("{tag}", tag)
    .replace("{package}", package)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let config = ShipConfig::load(dir.path()).unwrap();
    assert_eq!(config.release.tag_prefix, "v");
    assert_eq!(config.release.remote, "origin");
    assert_eq!(config.release.bump, VersionBump::Patch);
    assert_eq!(config.registry.token_env, "CARGO_REGISTRY_TOKEN");
    assert_eq!(config.retry.max_attempts, 3);
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("ship.toml"),
      r#"
[release]
package = "lib-a"
bump = "minor"

[retry]
max_attempts = 5
"#,
    )
    .unwrap();

    let config = ShipConfig::load(dir.path()).unwrap();
    assert_eq!(config.release.package.as_deref(), Some("lib-a"));
    assert_eq!(config.release.bump, VersionBump::Minor);
    assert_eq!(config.release.tag_prefix, "v");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.initial_backoff_ms, 2_000);
  }

  #[test]
  fn test_search_order_prefers_root_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".cargo")).unwrap();
    fs::write(dir.path().join(".cargo/ship.toml"), "[release]\ntag_prefix = \"rel-\"\n").unwrap();
    assert_eq!(ShipConfig::load(dir.path()).unwrap().release.tag_prefix, "rel-");

    fs::write(dir.path().join("ship.toml"), "[release]\ntag_prefix = \"v\"\n").unwrap();
    assert_eq!(ShipConfig::load(dir.path()).unwrap().release.tag_prefix, "v");
  }

  #[test]
  fn test_zero_attempts_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ship.toml"), "[retry]\nmax_attempts = 0\n").unwrap();
    let err = ShipConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ShipError::Config(ConfigError::Invalid { .. })));
  }

  #[test]
  fn test_half_identity_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ship.toml"), "[identity]\nname = \"Release Bot\"\n").unwrap();
    assert!(ShipConfig::load(dir.path()).is_err());
  }

  #[test]
  fn test_render_template() {
    let version = semver::Version::parse("1.3.0-beta.2").unwrap();
    let msg = render_template("Release {package} {tag} ({version})", "lib-a", &version, "v1.3.0-beta.2");
    assert_eq!(msg, "Release lib-a v1.3.0-beta.2 (1.3.0-beta.2)");
  }
}
