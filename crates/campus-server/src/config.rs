//! Runtime configuration, deserialised from `config.toml` layered with
//! `CAMPUS_*` environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use campus_api::ApiConfig;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_database_path")]
  pub database_path:   PathBuf,
  /// Directory of `.sql` assets. Defaults to the set bundled with the store.
  #[serde(default)]
  pub sql_root:        Option<PathBuf>,
  /// How long a session waits on a locked database before failing.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
  #[serde(default)]
  pub secure_cookies:  bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_database_path() -> PathBuf { PathBuf::from("campus.db") }

fn default_busy_timeout_ms() -> u64 { 5_000 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  pub fn database_path(&self) -> PathBuf { expand_tilde(&self.database_path) }

  pub fn sql_root(&self) -> PathBuf {
    self
      .sql_root
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| PathBuf::from(campus_store_sqlite::BUNDLED_SQL_ROOT))
  }

  pub fn api(&self) -> ApiConfig { ApiConfig { secure_cookies: self.secure_cookies } }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
