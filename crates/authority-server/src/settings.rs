//! Runtime configuration, deserialised from `config.toml` and `AUTHORITY_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use authority_core::scheme::{Scheme, SchemeRegistry};
use authority_index::WriterConfig;
use authority_providers::LobidConfig;
use serde::Deserialize;

use crate::Result;

pub const ENV_PREFIX: &str = "AUTHORITY";

/// Environment layer: `AUTHORITY_PORT`, `AUTHORITY_LOBID__TIMEOUT_MS`. A
/// double underscore separates nested keys.
pub fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub index:               WriterConfig,
  /// Upper bound for one provider call; unbounded when absent.
  pub provider_timeout_ms: Option<u64>,
  /// TOML file of `[[scheme]]` tables replacing the built-in schemes.
  pub schemes_path:        Option<PathBuf>,
  pub lobid:               LobidSection,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".into(),
      port:                8085,
      index:               WriterConfig::default(),
      provider_timeout_ms: None,
      schemes_path:        None,
      lobid:               LobidSection::default(),
    }
  }
}

/// The `[lobid]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LobidSection {
  pub enabled:      bool,
  pub base_url:     String,
  pub timeout_ms:   u64,
  pub search_limit: usize,
}

impl Default for LobidSection {
  fn default() -> Self {
    let client = LobidConfig::default();
    Self {
      enabled:      true,
      base_url:     client.base_url,
      timeout_ms:   client.timeout.as_millis() as u64,
      search_limit: client.search_limit,
    }
  }
}

impl LobidSection {
  pub fn client(&self) -> LobidConfig {
    LobidConfig {
      base_url:     self.base_url.clone(),
      timeout:      Duration::from_millis(self.timeout_ms),
      search_limit: self.search_limit,
    }
  }
}

#[derive(Debug, Deserialize)]
struct SchemeTable {
  scheme: Vec<Scheme>,
}

/// The scheme registry named by `path`, or the built-in one.
pub fn load_schemes(path: Option<&Path>) -> Result<SchemeRegistry> {
  let Some(path) = path else {
    return Ok(SchemeRegistry::builtin());
  };
  let table: SchemeTable = config::Config::builder()
    .add_source(config::File::from(expand_tilde(path)))
    .build()?
    .try_deserialize()?;
  Ok(SchemeRegistry::new(table.scheme)?)
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
