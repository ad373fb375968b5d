//! Service configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! data_dir = "./data"
//! in_memory = false
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//! gc_interval_ms = 1000
//! refresh_interval_secs = 60
//!
//! [decision]
//! timeout_secs = 3
//! ```

mod server;

pub use server::ServerConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub decision: DecisionConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Keep everything in process memory instead of SQLite.
    pub in_memory: bool,
}

impl StorageConfig {
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("rollout.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub gc_interval_ms: u64,
    pub refresh_interval_secs: u64,
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms.max(1))
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 5 * 60,
            gc_interval_ms: 1000,
            refresh_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub timeout_secs: u64,
}

impl DecisionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self { timeout_secs: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.gc_interval(), Duration::from_secs(1));
        assert_eq!(config.cache.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.decision.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [server]
            port = 9090

            [cache]
            ttl_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_reports_path_on_bad_toml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("rollout.toml");
        fs::write(&path, "[cache\nttl_secs = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("rollout.toml")));
    }

    #[test]
    fn test_db_path() {
        let storage = StorageConfig::default();
        assert_eq!(storage.db_path(), PathBuf::from("./data/rollout.db"));
    }
}
