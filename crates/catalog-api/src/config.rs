//! Runtime configuration, deserialised from `config.toml` and `CATALOG_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use catalog_core::{audit::SYSTEM_ACTOR, service::AuditPolicy};
use serde::Deserialize;

// ─── Server ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_database_path")]
  pub database_path:    PathBuf,
  /// How long a mutation waits for another writer's lock.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:  u64,
  #[serde(default = "default_environment")]
  pub environment:      String,
  #[serde(default = "default_application_name")]
  pub application_name: String,
  #[serde(default)]
  pub audit:            AuditConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_database_path() -> PathBuf { PathBuf::from("~/.local/share/catalog/catalog.db") }

fn default_busy_timeout_ms() -> u64 { 5_000 }

fn default_environment() -> String { "Production".to_owned() }

fn default_application_name() -> String { "CatalogAPI".to_owned() }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             default_host(),
      port:             default_port(),
      database_path:    default_database_path(),
      busy_timeout_ms:  default_busy_timeout_ms(),
      environment:      default_environment(),
      application_name: default_application_name(),
      audit:            AuditConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the TOML file at `path` (optional) under `CATALOG_*` variables.
  /// Nested keys use `__`, e.g. `CATALOG_AUDIT__URL`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CATALOG")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  /// The database path with a leading `~` expanded.
  pub fn database_path(&self) -> PathBuf { expand_tilde(&self.database_path) }

  pub fn policy(&self) -> AuditPolicy {
    AuditPolicy {
      actor:            self.audit.actor.clone(),
      record_creates:   self.audit.record_creates,
      environment:      self.environment.clone(),
      application_name: self.application_name.clone(),
    }
  }
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
  #[default]
  Elasticsearch,
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
  pub backend:        AuditBackend,
  /// Elasticsearch base URL.
  pub url:            String,
  pub actor:          String,
  pub record_creates: bool,
}

impl Default for AuditConfig {
  fn default() -> Self {
    Self {
      backend:        AuditBackend::default(),
      url:            "http://localhost:9200".to_owned(),
      actor:          SYSTEM_ACTOR.to_owned(),
      record_creates: false,
    }
  }
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.audit.backend, AuditBackend::Elasticsearch);
    assert_eq!(cfg.audit.actor, "system");
    assert!(!cfg.audit.record_creates);
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      r#"
        port            = 9000
        database_path   = "/var/lib/catalog.db"
        busy_timeout_ms = 250
        environment     = "Staging"

        [audit]
        backend        = "memory"
        record_creates = true
      "#,
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:9000");
    assert_eq!(cfg.database_path(), PathBuf::from("/var/lib/catalog.db"));
    assert_eq!(cfg.busy_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.audit.backend, AuditBackend::Memory);
    assert_eq!(cfg.audit.url, "http://localhost:9200");

    let policy = cfg.policy();
    assert!(policy.record_creates);
    assert_eq!(policy.environment, "Staging");
    assert_eq!(policy.application_name, "CatalogAPI");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let cfg = ServerConfig::default();
    assert!(cfg.database_path().starts_with(home));
  }
}
