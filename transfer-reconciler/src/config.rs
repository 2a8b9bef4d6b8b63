//! Configuration for the reconciler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ingestion configuration
    pub ingest: IngestConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "transfer-reconciler".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ingest: IngestConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of partition actors (events routed by transfer_id hash)
    pub partitions: usize,

    /// Bounded mailbox capacity per partition
    pub mailbox_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            partitions: 8,
            mailbox_capacity: 1000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file (in-memory only when unset)
    pub snapshot_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(partitions) = std::env::var("RECONCILER_PARTITIONS") {
            config.ingest.partitions = partitions.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid RECONCILER_PARTITIONS: {}", partitions))
            })?;
        }

        if let Ok(capacity) = std::env::var("RECONCILER_MAILBOX_CAPACITY") {
            config.ingest.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid RECONCILER_MAILBOX_CAPACITY: {}", capacity))
            })?;
        }

        if let Ok(path) = std::env::var("RECONCILER_SNAPSHOT_PATH") {
            config.storage.snapshot_path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("RECONCILER_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(json) = std::env::var("RECONCILER_LOG_JSON") {
            config.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.ingest.partitions == 0 {
            return Err(crate::Error::Config(
                "ingest.partitions must be > 0".to_string(),
            ));
        }
        if self.ingest.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "ingest.mailbox_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "transfer-reconciler");
        assert_eq!(config.ingest.partitions, 8);
        assert!(config.storage.snapshot_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [ingest]
            partitions = 2

            [storage]
            snapshot_path = "/var/lib/reconciler/ledger.bin"
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.partitions, 2);
        assert_eq!(config.ingest.mailbox_capacity, 1000);
        assert_eq!(
            config.storage.snapshot_path,
            Some(PathBuf::from("/var/lib/reconciler/ledger.bin"))
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let err = Config::from_toml("[ingest]\npartitions = 0\n").unwrap_err();
        assert!(err.to_string().contains("partitions"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("reconciler.toml");
        std::fs::write(&path, "service_name = \"recon-test\"\n[logging]\njson = true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.service_name, "recon-test");
        assert!(config.logging.json);
    }
}
