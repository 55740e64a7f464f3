//! Layered CLI configuration: TOML file, then `HAUL_*` environment.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

use crate::client::ApiConfig;

/// Settings read from the config file and environment. Command-line flags
/// are applied on top by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://localhost:8080".to_string() }

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/haul/session.db")
}

fn default_timeout_secs() -> u64 { 30 }

impl CliConfig {
  /// Read `path` (if it exists) and overlay `HAUL_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("HAUL"))
      .build()
      .with_context(|| format!("failed to read config {}", path.display()))?;

    settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")
  }

  pub fn api(&self) -> ApiConfig {
    ApiConfig {
      base_url: self.base_url.clone(),
      timeout:  Duration::from_secs(self.timeout_secs),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
