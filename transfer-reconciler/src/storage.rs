//! Pluggable persistence for ledger snapshots
//!
//! The ledger keeps all state in memory. A [`Storage`] backend only sees
//! whole snapshots: `load` once at startup, `save` whenever the owner
//! decides (the binary saves on shutdown).
//!
//! # Backends
//!
//! - [`MemoryStorage`] - last saved snapshot kept in process (tests)
//! - [`FileStorage`] - bincode snapshot file, replaced atomically via rename

use crate::{error::Result, types::TransferRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot format version written by [`FileStorage`]
const SNAPSHOT_VERSION: u32 = 1;

/// Load/save interface for ledger state
pub trait Storage: Send + Sync {
    /// Load the last saved records (empty if nothing was saved)
    fn load(&self) -> Result<Vec<TransferRecord>>;

    /// Persist `records`, replacing any previous snapshot
    fn save(&self, records: &[TransferRecord]) -> Result<()>;
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<Vec<TransferRecord>>,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Vec<TransferRecord>> {
        Ok(self.records.read().clone())
    }

    fn save(&self, records: &[TransferRecord]) -> Result<()> {
        *self.records.write() = records.to_vec();
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    records: Vec<TransferRecord>,
}

/// Snapshot file on local disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Use `path` as the snapshot file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Vec<TransferRecord>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?self.path, "No snapshot found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = bincode::deserialize(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::Error::Storage(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        tracing::info!(
            path = ?self.path,
            transfers = snapshot.records.len(),
            "Snapshot loaded"
        );
        Ok(snapshot.records)
    }

    fn save(&self, records: &[TransferRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            records: records.to_vec(),
        };
        let bytes = bincode::serialize(&snapshot)?;

        let temp = self.temp_path();
        std::fs::write(&temp, &bytes)?;
        std::fs::rename(&temp, &self.path)?;

        tracing::info!(
            path = ?self.path,
            transfers = records.len(),
            bytes = bytes.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransferLedger;
    use crate::types::{TransferEvent, TransferStatus};
    use chrono::{TimeZone, Utc};

    fn populated_ledger() -> TransferLedger {
        let ts = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let ledger = TransferLedger::new();
        ledger.apply(TransferEvent::new("tr-1", "e1", TransferStatus::Initiated, ts));
        ledger.apply(
            TransferEvent::new("tr-1", "e2", TransferStatus::Settled, ts).with_reason("fast path"),
        );
        ledger.apply(TransferEvent::new("tr-2", "e1", TransferStatus::Failed, ts));
        ledger
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_empty());

        let ledger = populated_ledger();
        storage.save(&ledger.snapshot()).unwrap();
        assert_eq!(storage.load().unwrap().len(), 2);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("absent.bin"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_storage_restores_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("nested/ledger.bin"));

        let ledger = populated_ledger();
        storage.save(&ledger.snapshot()).unwrap();
        assert!(!storage.temp_path().exists());

        let restored = TransferLedger::new();
        restored.restore(storage.load().unwrap());

        let original = ledger.record("tr-1").unwrap();
        assert_eq!(restored.record("tr-1").unwrap(), original);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_file_storage_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.bin");
        std::fs::write(&path, b"definitely not bincode").unwrap();

        assert!(FileStorage::new(path).load().is_err());
    }
}
